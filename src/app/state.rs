use super::{ControllerStatus, TorchController};
use crate::sequencer::Mode;

impl TorchController {
    /// Currently selected mode
    pub fn mode(&self) -> Mode {
        self.sequencer.snapshot().mode
    }

    pub fn is_active(&self) -> bool {
        self.sequencer.snapshot().active
    }

    /// Microphone spectrum for sound-reactive visualisers
    pub fn spectrum(&self) -> Vec<u8> {
        self.sequencer.spectrum()
    }

    /// Snapshot of everything the presentation layer renders
    pub async fn status(&self) -> ControllerStatus {
        let snapshot = self.sequencer.snapshot();
        ControllerStatus {
            mode: snapshot.mode,
            active: snapshot.active,
            strobe_interval_ms: self.sequencer.strobe_interval().as_millis() as u64,
            screen_color: self.sequencer.screen_color(),
            mood: self.sequencer.mood(),
            transmitting: self.sequencer.is_transmitting().await,
            motion_trigger: self.motion.is_enabled(),
            sound_trigger: self.sequencer.sound_trigger_enabled(),
            error: self.errors.current(),
        }
    }
}
