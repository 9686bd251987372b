use super::TorchController;
use crate::error::{Result, TorchError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl TorchController {
    /// Stop triggers, force the torch off and release the hardware
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                let keyboard = keyboard_handler.stop();
                if let Err(e) = stop_step("keyboard", Duration::from_secs(2), keyboard).await {
                    error!("Error stopping keyboard: {}", e);
                    exit_code = 1;
                }
            }
        }

        let motion = async {
            self.motion.disable().await;
            Ok(())
        };
        if let Err(e) = stop_step("motion trigger", Duration::from_secs(2), motion).await {
            error!("Error stopping motion trigger: {}", e);
            exit_code = 1;
        }

        let sequencer = async {
            let mode = self.sequencer.snapshot().mode;
            self.sequencer.on_mode_or_activity_changed(mode, false).await;
            Ok(())
        };
        if let Err(e) = stop_step("sequencer", Duration::from_secs(5), sequencer).await {
            error!("Error stopping sequencer: {}", e);
            exit_code = 1;
        }

        // Released even when the steps above failed
        self.sequencer.driver().release().await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}

async fn stop_step<F>(component: &str, limit: Duration, step: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    info!("Stopping {}", component);
    match timeout(limit, step).await {
        Ok(Ok(())) => {
            info!("{} stopped", component);
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(TorchError::system(format!("{} stop timeout", component))),
    }
}
