use crate::advisor::MoodConfig;
use crate::sequencer::Mode;
use crate::status::UserFacingError;
use serde::Serialize;

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest(String),
}

/// Everything a presentation layer needs to render the controller
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub mode: Mode,
    pub active: bool,
    pub strobe_interval_ms: u64,
    pub screen_color: String,
    pub mood: Option<MoodConfig>,
    pub transmitting: bool,
    pub motion_trigger: bool,
    pub sound_trigger: bool,
    pub error: Option<UserFacingError>,
}
