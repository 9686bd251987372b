mod analyzer;
#[cfg(feature = "microphone")]
mod cpal_input;
mod monitor;
mod scripted;

pub use analyzer::{average, SpectrumAnalyzer};
#[cfg(feature = "microphone")]
pub use cpal_input::CpalMicrophone;
pub use monitor::{AmplitudeMonitor, AmplitudeProbe, MicrophoneSource, SoundTrigger};
pub use scripted::{ScriptedAmplitude, ScriptedMicrophone};

use crate::config::AudioConfig;
use std::sync::Arc;

/// Amplitude monitor over the host microphone when built with the
/// `microphone` feature, otherwise over a source reporting no device
pub fn default_amplitude_monitor(config: &AudioConfig) -> AmplitudeMonitor {
    #[cfg(feature = "microphone")]
    let source: Arc<dyn MicrophoneSource> = Arc::new(CpalMicrophone::new(config.device.clone()));
    #[cfg(not(feature = "microphone"))]
    let source: Arc<dyn MicrophoneSource> = Arc::new(ScriptedMicrophone::unavailable());

    AmplitudeMonitor::new(source, config)
}
