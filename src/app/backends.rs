use crate::advisor::{LightingAdvisor, OfflineAdvisor};
use crate::audio::{default_amplitude_monitor, AmplitudeProbe, ScriptedAmplitude};
use crate::config::TorchlightConfig;
use crate::hardware::{capture_device_from_config, CaptureDevice, SimulatedCaptureDevice};
use crate::motion::{IioAccelerometer, MotionSource, ScriptedMotionSource};
use std::sync::Arc;

/// The host boundaries the controller drives
#[derive(Clone)]
pub struct Backends {
    pub capture: Arc<dyn CaptureDevice>,
    pub amplitude: Arc<dyn AmplitudeProbe>,
    pub motion: Arc<dyn MotionSource>,
    pub advisor: Arc<dyn LightingAdvisor>,
}

impl Backends {
    /// Host backends selected by the configuration
    pub fn from_config(config: &TorchlightConfig) -> Self {
        Self {
            capture: capture_device_from_config(&config.hardware),
            amplitude: Arc::new(default_amplitude_monitor(&config.audio)),
            motion: Arc::new(IioAccelerometer::new(&config.triggers.accelerometer_path)),
            advisor: Arc::new(OfflineAdvisor),
        }
    }

    /// In-memory backends; nothing on the host is touched
    pub fn simulated() -> Self {
        Self {
            capture: Arc::new(SimulatedCaptureDevice::new()),
            amplitude: Arc::new(ScriptedAmplitude::new()),
            motion: Arc::new(ScriptedMotionSource::new()),
            advisor: Arc::new(OfflineAdvisor),
        }
    }
}
