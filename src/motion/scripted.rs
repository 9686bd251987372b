use super::detector::AccelSample;
use super::source::MotionSource;
use crate::error::CaptureError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct ScriptState {
    deny: bool,
    queued: VecDeque<AccelSample>,
    resting: Option<AccelSample>,
    permission_requests: usize,
}

/// Motion source replaying queued samples, then holding a resting sample.
/// Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedMotionSource {
    state: Arc<Mutex<ScriptState>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedMotionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose permission request is declined
    pub fn denied() -> Self {
        let source = Self::new();
        source.state.lock().deny = true;
        source
    }

    pub fn push(&self, sample: AccelSample) {
        self.state.lock().queued.push_back(sample);
    }

    /// Queue one sample whose magnitude is `magnitude`
    pub fn push_shake(&self, magnitude: f64) {
        self.push(AccelSample::new(magnitude / 3.0, magnitude / 3.0, magnitude / 3.0));
    }

    /// Sample returned once the queue is empty
    pub fn hold(&self, sample: AccelSample) {
        self.state.lock().resting = Some(sample);
    }

    pub fn permission_requests(&self) -> usize {
        self.state.lock().permission_requests
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MotionSource for ScriptedMotionSource {
    fn name(&self) -> &str {
        "scripted-motion"
    }

    async fn request_permission(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        state.permission_requests += 1;
        if state.deny {
            return Err(CaptureError::NotAllowed {
                device: "motion sensor".to_string(),
            });
        }
        Ok(())
    }

    async fn read(&self) -> Result<AccelSample, CaptureError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        Ok(state
            .queued
            .pop_front()
            .or(state.resting)
            .unwrap_or(AccelSample::AT_REST))
    }
}
