use super::TorchController;
use crate::error::Result;
use crate::sequencer::Mode;
use tracing::{error, info, warn};

impl TorchController {
    /// Apply the initial selection and start the configured triggers
    pub async fn start(&self, mode: Mode, active: bool) -> Result<()> {
        info!("Starting torchlight in {} mode", mode);

        self.sequencer.on_mode_or_activity_changed(mode, active).await;

        if self.config.triggers.motion_enabled {
            // A denied sensor is reported and leaves the trigger off
            if let Err(e) = self.motion.enable().await {
                warn!("Motion trigger not started: {}", e);
            }
        }

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard handler: {}", e);
                    e
                })?;
                info!("Keyboard control active - SPACE toggles, 1-7 select modes, q quits");
            }
        }

        info!("Torchlight started");
        Ok(())
    }
}
