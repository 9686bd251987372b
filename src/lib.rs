pub mod advisor;
pub mod app;
pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod hardware;
pub mod keyboard_input;
pub mod motion;
pub mod sequencer;
pub mod status;

pub use advisor::{LightingAdvisor, MoodConfig, OfflineAdvisor};
pub use app::{Backends, ControllerStatus, ShutdownReason, TorchController};
pub use audio::{AmplitudeMonitor, AmplitudeProbe, MicrophoneSource, SoundTrigger, SpectrumAnalyzer};
pub use config::TorchlightConfig;
pub use control::{control_channel, ControlRequest, ControlSender, TriggerSource};
pub use error::{CaptureError, ErrorCategory, Result, TorchError};
pub use events::{EventBus, EventFilter, EventReceiver, TorchEvent};
pub use hardware::{
    CaptureDevice, HardwareSession, SimulatedCaptureDevice, SysfsTorchDevice, TorchDriver,
};
pub use keyboard_input::KeyboardInputHandler;
pub use motion::{AccelSample, IioAccelerometer, MotionSource, MotionTriggerMonitor, ShakeDetector};
pub use sequencer::{Mode, ModeSequencer, MorseProgram, Symbol, TransmitOutcome};
pub use status::{ErrorSlot, UserFacingError};
