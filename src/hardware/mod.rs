mod capture;
mod driver;
mod session;
mod simulated;
mod sysfs;
#[cfg(test)]
mod tests;

pub use capture::{
    CaptureConstraints, CaptureDevice, CaptureTrack, FillLightMode, TorchCapabilities,
    TorchConstraint,
};
pub use driver::TorchDriver;
pub use session::{HardwareSession, SessionStats};
pub use simulated::{OpenScript, SimulatedCaptureDevice};
pub use sysfs::{SysfsTorchDevice, SysfsTorchTrack};

use crate::config::{HardwareBackend, HardwareConfig};
use std::sync::Arc;

/// Build the capture device selected by the configuration
pub fn capture_device_from_config(config: &HardwareConfig) -> Arc<dyn CaptureDevice> {
    match config.backend {
        HardwareBackend::Sysfs => Arc::new(SysfsTorchDevice::new(&config.leds_path)),
        HardwareBackend::Simulated => Arc::new(SimulatedCaptureDevice::new()),
    }
}
