use super::capture::{
    CaptureConstraints, CaptureDevice, CaptureTrack, FillLightMode, TorchCapabilities,
    TorchConstraint,
};
use crate::config::Facing;
use crate::error::CaptureError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Scripted result of one `open` call
#[derive(Debug, Clone, PartialEq)]
pub enum OpenScript {
    Succeed,
    Fail(CaptureError),
    /// Opens a track that is already dead
    Partial,
}

#[derive(Debug, Default)]
struct TrackRecord {
    live: bool,
    stopped: bool,
}

#[derive(Debug)]
struct SimulatedState {
    facing: Facing,
    torch_supported: bool,
    capabilities_available: bool,
    fill_light: bool,
    reject_fill_light: bool,
    sink_fails: bool,
    open_delay: Option<Duration>,
    sink_delay: Option<Duration>,
    open_script: VecDeque<OpenScript>,
    failing_writes: u32,
    open_attempts: Vec<CaptureConstraints>,
    writes: Vec<TorchConstraint>,
    timeline: Vec<(Instant, bool)>,
    tracks: Vec<TrackRecord>,
    torch_on: bool,
}

/// In-memory torch device that records every interaction.
///
/// Cloning shares the same state, so a test keeps one clone for inspection
/// while the session owns another.
#[derive(Clone)]
pub struct SimulatedCaptureDevice {
    name: String,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedCaptureDevice {
    pub fn new() -> Self {
        Self {
            name: "simulated-torch".to_string(),
            state: Arc::new(Mutex::new(SimulatedState {
                facing: Facing::Environment,
                torch_supported: true,
                capabilities_available: true,
                fill_light: true,
                reject_fill_light: false,
                sink_fails: false,
                open_delay: None,
                sink_delay: None,
                open_script: VecDeque::new(),
                failing_writes: 0,
                open_attempts: Vec::new(),
                writes: Vec::new(),
                timeline: Vec::new(),
                tracks: Vec::new(),
                torch_on: false,
            })),
        }
    }

    pub fn with_facing(self, facing: Facing) -> Self {
        self.state.lock().facing = facing;
        self
    }

    pub fn with_torch_supported(self, supported: bool) -> Self {
        self.state.lock().torch_supported = supported;
        self
    }

    /// Tracks report no capability descriptor at all
    pub fn without_capabilities(self) -> Self {
        self.state.lock().capabilities_available = false;
        self
    }

    pub fn with_fill_light(self, fill_light: bool) -> Self {
        self.state.lock().fill_light = fill_light;
        self
    }

    /// Constraints carrying a fill-light hint are rejected
    pub fn rejecting_fill_light(self) -> Self {
        self.state.lock().reject_fill_light = true;
        self
    }

    pub fn with_failing_sink(self) -> Self {
        self.state.lock().sink_fails = true;
        self
    }

    /// Every open waits this long before resolving
    pub fn with_open_delay(self, delay: Duration) -> Self {
        self.state.lock().open_delay = Some(delay);
        self
    }

    /// Starting the consuming sink of every track takes this long
    pub fn with_sink_delay(self, delay: Duration) -> Self {
        self.state.lock().sink_delay = Some(delay);
        self
    }

    /// Queue results for the next open calls; unscripted opens succeed
    pub fn script_opens<I: IntoIterator<Item = OpenScript>>(&self, script: I) {
        self.state.lock().open_script.extend(script);
    }

    /// Fail the next `count` torch writes
    pub fn fail_next_writes(&self, count: u32) {
        self.state.lock().failing_writes = count;
    }

    /// Mark every open track as dead, as if the camera was taken away
    pub fn kill_tracks(&self) {
        for track in self.state.lock().tracks.iter_mut() {
            track.live = false;
        }
    }

    pub fn open_attempts(&self) -> Vec<CaptureConstraints> {
        self.state.lock().open_attempts.clone()
    }

    pub fn writes(&self) -> Vec<TorchConstraint> {
        self.state.lock().writes.clone()
    }

    /// Torch states that reached the hardware, in order
    pub fn torch_history(&self) -> Vec<bool> {
        self.state.lock().writes.iter().map(|w| w.torch).collect()
    }

    /// Accepted torch states with the (tokio) instant they were written
    pub fn torch_timeline(&self) -> Vec<(Instant, bool)> {
        self.state.lock().timeline.clone()
    }

    pub fn torch_on(&self) -> bool {
        self.state.lock().torch_on
    }

    /// Tracks opened and not yet stopped
    pub fn active_tracks(&self) -> usize {
        self.state.lock().tracks.iter().filter(|t| !t.stopped).count()
    }

    pub fn opened_tracks(&self) -> usize {
        self.state.lock().tracks.len()
    }
}

impl Default for SimulatedCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for SimulatedCaptureDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureTrack>, CaptureError> {
        let delay = {
            let mut state = self.state.lock();
            state.open_attempts.push(*constraints);
            state.open_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let script = state.open_script.pop_front().unwrap_or(OpenScript::Succeed);
        if let OpenScript::Fail(e) = script {
            debug!("Simulated open with {} constraints fails: {}", constraints, e);
            return Err(e);
        }

        if !constraints.accepts(state.facing) {
            return Err(CaptureError::Overconstrained {
                constraint: constraints.to_string(),
            });
        }

        let id = state.tracks.len();
        state.tracks.push(TrackRecord {
            live: script != OpenScript::Partial,
            stopped: false,
        });
        info!("Simulated torch track {} opened", id);

        Ok(Box::new(SimulatedTrack {
            id,
            label: format!("simulated-torch-{}", id),
            state: Arc::clone(&self.state),
        }))
    }
}

struct SimulatedTrack {
    id: usize,
    label: String,
    state: Arc<Mutex<SimulatedState>>,
}

#[async_trait]
impl CaptureTrack for SimulatedTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_live(&self) -> bool {
        let state = self.state.lock();
        let track = &state.tracks[self.id];
        track.live && !track.stopped
    }

    fn capabilities(&self) -> Option<TorchCapabilities> {
        let state = self.state.lock();
        if !state.capabilities_available {
            return None;
        }
        Some(TorchCapabilities {
            torch: state.torch_supported,
            fill_light_modes: if state.fill_light {
                vec![FillLightMode::Off, FillLightMode::Flash]
            } else {
                Vec::new()
            },
        })
    }

    async fn attach_sink(&mut self) -> Result<(), CaptureError> {
        let (fails, delay) = {
            let state = self.state.lock();
            (state.sink_fails, state.sink_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fails {
            return Err(CaptureError::Other("playback was interrupted".to_string()));
        }
        Ok(())
    }

    async fn apply_torch(&mut self, constraint: &TorchConstraint) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if !state.tracks[self.id].live {
            return Err(CaptureError::NotReadable {
                device: self.label.clone(),
                details: "track ended".to_string(),
            });
        }
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(CaptureError::Other("torch write rejected".to_string()));
        }
        if state.reject_fill_light && constraint.fill_light_mode.is_some() {
            return Err(CaptureError::Overconstrained {
                constraint: "fillLightMode".to_string(),
            });
        }

        state.writes.push(*constraint);
        state.timeline.push((Instant::now(), constraint.torch));
        state.torch_on = constraint.torch;
        Ok(())
    }

    fn stop(&mut self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let track = &mut state.tracks[self.id];
        if !track.stopped {
            track.stopped = true;
            // Stopping the capture turns the torch off
            state.torch_on = false;
        }
    }
}
