mod detector;
mod monitor;
mod scripted;
mod source;

pub use detector::{AccelSample, ShakeDetector};
pub use monitor::MotionTriggerMonitor;
pub use scripted::ScriptedMotionSource;
pub use source::{IioAccelerometer, MotionSource};
