use crate::error::{ErrorCategory, TorchError};
use crate::events::{EventBus, TorchEvent};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Message currently shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFacingError {
    pub category: ErrorCategory,
    pub message: String,
    /// Offer a retry; false for conditions retrying cannot fix
    pub retryable: bool,
    pub raised_at: DateTime<Utc>,
}

/// Single current-error slot shared by every component that can fail visibly
#[derive(Clone)]
pub struct ErrorSlot {
    current: Arc<Mutex<Option<UserFacingError>>>,
    events: EventBus,
}

impl ErrorSlot {
    pub fn new(events: EventBus) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            events,
        }
    }

    /// Show `error` if it belongs to a user-facing category.
    /// Returns whether the slot changed.
    pub fn report(&self, error: &TorchError) -> bool {
        let Some(category) = error.category() else {
            debug!("Not surfacing internal error: {}", error);
            return false;
        };

        let message = error.user_message();
        {
            let mut current = self.current.lock();
            if let Some(existing) = current.as_ref() {
                if existing.category == category && existing.message == message {
                    return false;
                }
            }
            *current = Some(UserFacingError {
                category,
                message: message.clone(),
                retryable: error.is_recoverable(),
                raised_at: Utc::now(),
            });
        }

        self.events.emit(TorchEvent::ErrorRaised { category, message });
        true
    }

    pub fn clear(&self) {
        let previous = self.current.lock().take();
        if previous.is_some() {
            self.events.emit(TorchEvent::ErrorCleared);
        }
    }

    pub fn current(&self) -> Option<UserFacingError> {
        self.current.lock().clone()
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.current.lock().as_ref().map(|e| e.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_and_clear() {
        let events = EventBus::new(10);
        let mut receiver = events.subscribe();
        let slot = ErrorSlot::new(events);

        assert!(slot.report(&TorchError::PermissionDenied {
            device: "white:flash".to_string(),
        }));
        assert_eq!(slot.category(), Some(ErrorCategory::PermissionDenied));
        assert!(slot.current().unwrap().retryable);
        assert!(matches!(
            receiver.try_recv().unwrap(),
            TorchEvent::ErrorRaised {
                category: ErrorCategory::PermissionDenied,
                ..
            }
        ));

        // The same message twice does not republish
        assert!(!slot.report(&TorchError::PermissionDenied {
            device: "white:flash".to_string(),
        }));

        slot.clear();
        assert!(slot.current().is_none());
        assert!(matches!(receiver.try_recv().unwrap(), TorchEvent::ErrorCleared));

        // Clearing an empty slot is silent
        slot.clear();
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_unsupported_hardware_offers_no_retry() {
        let slot = ErrorSlot::new(EventBus::new(10));
        slot.report(&TorchError::HardwareUnsupported {
            device: "white:flash".to_string(),
        });
        let current = slot.current().unwrap();
        assert_eq!(current.category, ErrorCategory::HardwareUnsupported);
        assert!(!current.retryable);

        slot.report(&TorchError::MicrophoneRequired {
            details: "denied".to_string(),
        });
        assert!(slot.current().unwrap().retryable);
    }

    #[test]
    fn test_internal_errors_are_not_surfaced() {
        let slot = ErrorSlot::new(EventBus::new(10));
        assert!(!slot.report(&TorchError::system("scheduler bookkeeping")));
        assert!(slot.current().is_none());
    }
}
