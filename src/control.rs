use crate::sequencer::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Where an activity toggle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    User,
    Shake,
    Sound,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::User => write!(f, "user"),
            TriggerSource::Shake => write!(f, "shake"),
            TriggerSource::Sound => write!(f, "sound"),
        }
    }
}

/// Requests handled by the controller's run loop
#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequest {
    ToggleActivity { source: TriggerSource },
    SetActive(bool),
    SelectMode(Mode),
    /// Change the strobe interval by this many milliseconds
    AdjustStrobe(i64),
    CycleScreenColor,
    TransmitMessage(String),
    ToggleMotionTrigger,
    ToggleSoundTrigger,
    Shutdown { reason: String },
}

pub type ControlSender = mpsc::UnboundedSender<ControlRequest>;
pub type ControlReceiver = mpsc::UnboundedReceiver<ControlRequest>;

pub fn control_channel() -> (ControlSender, ControlReceiver) {
    mpsc::unbounded_channel()
}
