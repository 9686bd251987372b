use super::session::{HardwareSession, SessionStats};
use crate::events::{EventBus, TorchEvent};
use crate::status::ErrorSlot;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::warn;

/// Shared, serialized access to the hardware session.
///
/// Every torch write in the system goes through here. The session lock is
/// held for the whole apply, so a turn-on request that arrives while an
/// acquisition is in flight waits for it and reuses the resulting track.
/// Dropping a pending `set_torch` abandons the apply together with any
/// acquisition it started.
#[derive(Clone)]
pub struct TorchDriver {
    session: Arc<Mutex<HardwareSession>>,
    errors: ErrorSlot,
    events: EventBus,
}

impl TorchDriver {
    pub fn new(session: HardwareSession, errors: ErrorSlot, events: EventBus) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            errors,
            events,
        }
    }

    /// Apply a torch state. Failures are reported to the error slot and
    /// never propagate; returns whether the state was applied.
    pub async fn set_torch(&self, on: bool) -> bool {
        let (result, written) = {
            let mut session = self.session.lock().await;
            let writes_before = session.stats().hardware_writes;
            let result = session.apply(on).await;
            (result, session.stats().hardware_writes > writes_before)
        };

        match result {
            Ok(()) => {
                if written {
                    self.events.emit(TorchEvent::TorchApplied {
                        on,
                        timestamp: SystemTime::now(),
                    });
                }
                true
            }
            Err(e) => {
                warn!("Torch {} request failed: {}", if on { "on" } else { "off" }, e);
                self.errors.report(&e);
                false
            }
        }
    }

    /// Stop every hardware track held by the session
    pub async fn release(&self) {
        self.session.lock().await.release();
    }

    pub async fn is_live(&self) -> bool {
        self.session.lock().await.is_live()
    }

    pub async fn last_applied(&self) -> Option<bool> {
        self.session.lock().await.last_applied()
    }

    pub async fn stats(&self) -> SessionStats {
        self.session.lock().await.stats()
    }

    pub fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}
