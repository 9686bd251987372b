use super::analyzer::SpectrumAnalyzer;
use crate::config::{AudioConfig, TriggerConfig};
use crate::error::{CaptureError, Result, TorchError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A microphone-only capture producing mono PCM samples
#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    fn name(&self) -> &str;

    /// Start capturing; repeated calls on an open source are no-ops
    async fn open(&self) -> std::result::Result<(), CaptureError>;

    /// Copy the newest samples into the tail of `buf`; returns how many
    /// were written
    fn read_latest(&self, buf: &mut [f32]) -> usize;

    fn close(&self);

    fn is_open(&self) -> bool;
}

/// Continuous amplitude signal consumed by the sound-reactive schedule
#[async_trait]
pub trait AmplitudeProbe: Send + Sync {
    async fn start(&self) -> Result<()>;

    /// Current amplitude on a 0-255 scale
    fn sample(&self) -> f32;

    /// Per-bin levels (0-255) behind the latest sample, for visualisers
    fn spectrum(&self) -> Vec<u8>;

    fn stop(&self);
}

/// Microphone amplitude computed from the byte frequency spectrum
pub struct AmplitudeMonitor {
    source: Arc<dyn MicrophoneSource>,
    analyzer: Mutex<SpectrumAnalyzer>,
    frame: Mutex<Vec<f32>>,
    last_spectrum: Mutex<Vec<u8>>,
}

impl AmplitudeMonitor {
    pub fn new(source: Arc<dyn MicrophoneSource>, config: &AudioConfig) -> Self {
        let analyzer = SpectrumAnalyzer::new(config);
        let frame = vec![0.0; analyzer.fft_size()];
        let bins = analyzer.bin_count();
        Self {
            source,
            analyzer: Mutex::new(analyzer),
            frame: Mutex::new(frame),
            last_spectrum: Mutex::new(vec![0; bins]),
        }
    }

    pub fn is_running(&self) -> bool {
        self.source.is_open()
    }
}

#[async_trait]
impl AmplitudeProbe for AmplitudeMonitor {
    async fn start(&self) -> Result<()> {
        if self.source.is_open() {
            return Ok(());
        }

        match self.source.open().await {
            Ok(()) => {
                info!("Microphone {} opened", self.source.name());
                self.analyzer.lock().reset();
                Ok(())
            }
            Err(e) => {
                warn!("Microphone {} unavailable: {}", self.source.name(), e);
                Err(TorchError::MicrophoneRequired {
                    details: e.to_string(),
                })
            }
        }
    }

    fn sample(&self) -> f32 {
        let mut frame = self.frame.lock();
        frame.iter_mut().for_each(|s| *s = 0.0);
        self.source.read_latest(&mut frame);

        let mut analyzer = self.analyzer.lock();
        let bins = analyzer.byte_frequency_data(&frame);
        self.last_spectrum.lock().copy_from_slice(bins);
        analyzer.average()
    }

    fn spectrum(&self) -> Vec<u8> {
        self.last_spectrum.lock().clone()
    }

    fn stop(&self) {
        if self.source.is_open() {
            debug!("Closing microphone {}", self.source.name());
            self.source.close();
        }
    }
}

/// Loud-sound detector that flips activity instead of driving the torch
#[derive(Debug, Clone)]
pub struct SoundTrigger {
    enabled: bool,
    threshold: f32,
    rearm: Duration,
    last_fired: Option<Instant>,
}

impl SoundTrigger {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            enabled: config.sound_enabled,
            threshold: config.sound_threshold,
            rearm: config.sound_rearm(),
            last_fired: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.last_fired = None;
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether `amplitude` fires the trigger at `now`
    pub fn check(&mut self, amplitude: f32, now: Instant) -> bool {
        if !self.enabled || amplitude <= self.threshold {
            return false;
        }
        if let Some(last) = self.last_fired {
            if now.duration_since(last) < self.rearm {
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ScriptedMicrophone;
    use crate::config::TorchlightConfig;
    use crate::error::ErrorCategory;

    fn trigger_config() -> TriggerConfig {
        TriggerConfig {
            sound_enabled: true,
            ..TorchlightConfig::default().triggers
        }
    }

    #[test]
    fn test_trigger_threshold_and_rearm() {
        let mut trigger = SoundTrigger::new(&trigger_config());
        let start = Instant::now();

        assert!(!trigger.check(88.0, start));
        assert!(trigger.check(120.0, start));
        assert!(!trigger.check(120.0, start + Duration::from_millis(699)));
        assert!(trigger.check(120.0, start + Duration::from_millis(700)));
    }

    #[test]
    fn test_disabled_trigger_never_fires() {
        let mut trigger = SoundTrigger::new(&TorchlightConfig::default().triggers);
        assert!(!trigger.is_enabled());
        assert!(!trigger.check(255.0, Instant::now()));

        trigger.set_enabled(true);
        assert!(trigger.check(255.0, Instant::now()));
    }

    #[tokio::test]
    async fn test_denied_microphone_maps_to_microphone_required() {
        let source = Arc::new(ScriptedMicrophone::denied());
        let monitor = AmplitudeMonitor::new(source, &AudioConfig::default());

        let err = monitor.start().await.unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::MicrophoneRequired));
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_silence_and_noise_amplitude() {
        let source = Arc::new(ScriptedMicrophone::new());
        let monitor = AmplitudeMonitor::new(source.clone(), &AudioConfig::default());
        monitor.start().await.unwrap();
        assert!(monitor.is_running());

        assert_eq!(monitor.sample(), 0.0);

        source.play_tone(0.9, 0.1);
        let mut level = 0.0;
        for _ in 0..10 {
            level = monitor.sample();
        }
        assert!(level > 0.0);
        assert_eq!(monitor.spectrum().len(), 128);

        monitor.stop();
        assert!(!monitor.is_running());
    }
}
