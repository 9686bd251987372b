use super::monitor::{AmplitudeProbe, MicrophoneSource};
use crate::error::{CaptureError, Result, TorchError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const SPECTRUM_BINS: usize = 128;

/// Microphone producing a synthetic signal
pub struct ScriptedMicrophone {
    failure: Option<CaptureError>,
    open: AtomicBool,
    signal: Mutex<Vec<f32>>,
}

impl ScriptedMicrophone {
    pub fn new() -> Self {
        Self {
            failure: None,
            open: AtomicBool::new(false),
            signal: Mutex::new(Vec::new()),
        }
    }

    /// A microphone the user refused access to
    pub fn denied() -> Self {
        Self {
            failure: Some(CaptureError::NotAllowed {
                device: "scripted-microphone".to_string(),
            }),
            ..Self::new()
        }
    }

    /// No input device at all
    pub fn unavailable() -> Self {
        Self {
            failure: Some(CaptureError::NotFound),
            ..Self::new()
        }
    }

    /// Sine of `amplitude` at `cycles_per_sample` of the sample rate
    pub fn play_tone(&self, amplitude: f32, cycles_per_sample: f32) {
        let samples = (0..4096)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * cycles_per_sample * i as f32).sin())
            .collect();
        *self.signal.lock() = samples;
    }

    pub fn silence(&self) {
        self.signal.lock().clear();
    }
}

impl Default for ScriptedMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MicrophoneSource for ScriptedMicrophone {
    fn name(&self) -> &str {
        "scripted-microphone"
    }

    async fn open(&self) -> std::result::Result<(), CaptureError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read_latest(&self, buf: &mut [f32]) -> usize {
        if !self.is_open() {
            return 0;
        }
        let signal = self.signal.lock();
        let count = signal.len().min(buf.len());
        let start = buf.len() - count;
        buf[start..].copy_from_slice(&signal[signal.len() - count..]);
        count
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Amplitude probe replaying queued levels, then holding the last one
pub struct ScriptedAmplitude {
    deny: bool,
    queued: Mutex<VecDeque<f32>>,
    level: Mutex<f32>,
    running: AtomicBool,
    starts: AtomicUsize,
    samples: AtomicUsize,
}

impl ScriptedAmplitude {
    pub fn new() -> Self {
        Self {
            deny: false,
            queued: Mutex::new(VecDeque::new()),
            level: Mutex::new(0.0),
            running: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            samples: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new()
        }
    }

    pub fn set_level(&self, level: f32) {
        self.queued.lock().clear();
        *self.level.lock() = level;
    }

    pub fn queue_levels<I: IntoIterator<Item = f32>>(&self, levels: I) {
        self.queued.lock().extend(levels);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedAmplitude {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AmplitudeProbe for ScriptedAmplitude {
    async fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(TorchError::MicrophoneRequired {
                details: "microphone permission denied".to_string(),
            });
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn sample(&self) -> f32 {
        self.samples.fetch_add(1, Ordering::SeqCst);
        let mut level = self.level.lock();
        if let Some(next) = self.queued.lock().pop_front() {
            *level = next;
        }
        *level
    }

    /// Flat spectrum at the current level
    fn spectrum(&self) -> Vec<u8> {
        let level = self.level.lock().clamp(0.0, 255.0) as u8;
        vec![level; SPECTRUM_BINS]
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
