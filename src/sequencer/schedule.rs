use super::mode::Mode;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Mode and activity as seen by running schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: Mode,
    pub active: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            mode: Mode::Steady,
            active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Repeating pattern started by entering a mode
    Pattern(Mode),
    /// One-shot Morse transmission
    Transmission,
}

/// Cooperative abort check handed to every schedule step.
///
/// A step proceeds only while the schedule was not cancelled and the
/// mode/activity combination it was started under still holds.
#[derive(Clone)]
pub struct StepGuard {
    origin: Snapshot,
    state: watch::Receiver<Snapshot>,
    token: CancellationToken,
}

impl StepGuard {
    pub fn new(origin: Snapshot, state: watch::Receiver<Snapshot>, token: CancellationToken) -> Self {
        Self {
            origin,
            state,
            token,
        }
    }

    pub fn holds(&self) -> bool {
        !self.token.is_cancelled() && *self.state.borrow() == self.origin
    }

    /// Wait `duration`; false if the schedule was invalidated meanwhile
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => self.holds(),
        }
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn origin(&self) -> Snapshot {
        self.origin
    }
}

/// The single outstanding schedule of the sequencer
pub struct ScheduleHandle {
    kind: ScheduleKind,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    pub fn spawn<F, Fut>(
        kind: ScheduleKind,
        origin: Snapshot,
        state: watch::Receiver<Snapshot>,
        body: F,
    ) -> Self
    where
        F: FnOnce(StepGuard) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let guard = StepGuard::new(origin, state, token.clone());
        let task = tokio::spawn(body(guard));
        debug!("Started {:?} schedule", kind);
        Self { kind, token, task }
    }

    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait until the task has exited, so it can no longer
    /// touch the hardware
    pub async fn cancel(self) {
        self.token.cancel();
        match self.task.await {
            Ok(()) => debug!("{:?} schedule stopped", self.kind),
            Err(e) if e.is_panic() => error!("{:?} schedule panicked: {}", self.kind, e),
            Err(e) => debug!("{:?} schedule aborted: {}", self.kind, e),
        }
    }
}
