use crate::error::{ErrorCategory, EventBusError};
use crate::sequencer::Mode;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events that can occur in the torch system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TorchEvent {
    /// The utility was switched on or off
    ActivityChanged { active: bool, timestamp: SystemTime },
    /// A different lighting mode was selected
    ModeChanged { mode: Mode, timestamp: SystemTime },
    /// A torch state reached the hardware
    TorchApplied { on: bool, timestamp: SystemTime },
    /// The screen overlay should show this color
    ScreenTint { color: String, opacity: f32 },
    /// The error slot now holds a message
    ErrorRaised {
        category: ErrorCategory,
        message: String,
    },
    /// The error slot was emptied
    ErrorCleared,
    /// The motion monitor saw a shake
    ShakeDetected {
        magnitude: f64,
        timestamp: SystemTime,
    },
    /// A loud sound crossed the trigger threshold
    SoundTriggered {
        amplitude: f32,
        timestamp: SystemTime,
    },
    /// A Morse transmission began
    MorseStarted { symbols: String },
    /// A Morse transmission ended
    MorseFinished { cancelled: bool },
    /// A generated mood configuration was applied
    MoodApplied { color: String, description: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl TorchEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            TorchEvent::ActivityChanged { active, .. } => {
                format!("Torch {}", if *active { "activated" } else { "deactivated" })
            }
            TorchEvent::ModeChanged { mode, .. } => format!("Mode changed to {}", mode),
            TorchEvent::TorchApplied { on, .. } => {
                format!("Torch {}", if *on { "on" } else { "off" })
            }
            TorchEvent::ScreenTint { color, opacity } => {
                format!("Screen tint {} at {:.2}", color, opacity)
            }
            TorchEvent::ErrorRaised { category, message } => {
                format!("Error ({:?}): {}", category, message)
            }
            TorchEvent::ErrorCleared => "Error cleared".to_string(),
            TorchEvent::ShakeDetected { magnitude, .. } => {
                format!("Shake detected with magnitude: {:.2}", magnitude)
            }
            TorchEvent::SoundTriggered { amplitude, .. } => {
                format!("Sound trigger at amplitude: {:.1}", amplitude)
            }
            TorchEvent::MorseStarted { symbols } => format!("Morse started: {}", symbols),
            TorchEvent::MorseFinished { cancelled } => {
                if *cancelled {
                    "Morse cancelled".to_string()
                } else {
                    "Morse completed".to_string()
                }
            }
            TorchEvent::MoodApplied { description, .. } => {
                format!("Mood applied: {}", description)
            }
            TorchEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            TorchEvent::ActivityChanged { .. } => "activity_changed",
            TorchEvent::ModeChanged { .. } => "mode_changed",
            TorchEvent::TorchApplied { .. } => "torch_applied",
            TorchEvent::ScreenTint { .. } => "screen_tint",
            TorchEvent::ErrorRaised { .. } => "error_raised",
            TorchEvent::ErrorCleared => "error_cleared",
            TorchEvent::ShakeDetected { .. } => "shake_detected",
            TorchEvent::SoundTriggered { .. } => "sound_triggered",
            TorchEvent::MorseStarted { .. } => "morse_started",
            TorchEvent::MorseFinished { .. } => "morse_finished",
            TorchEvent::MoodApplied { .. } => "mood_applied",
            TorchEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Event bus for the presentation layer using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<TorchEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<TorchEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: TorchEvent) -> Result<usize, EventBusError> {
        match &event {
            TorchEvent::ActivityChanged { active, .. } => {
                info!("Torch {}", if *active { "activated" } else { "deactivated" });
            }
            TorchEvent::ModeChanged { mode, .. } => {
                info!("Mode changed to {}", mode);
            }
            TorchEvent::ErrorRaised { category, message } => {
                warn!("User-facing error ({:?}): {}", category, message);
            }
            TorchEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                debug!("Event: {}", event.description());
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish without caring whether anyone is listening
    pub fn emit(&self, event: TorchEvent) {
        if let Err(e) = self.publish(event) {
            debug!("Event dropped: {}", e);
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&TorchEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &TorchEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<TorchEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(receiver: broadcast::Receiver<TorchEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<TorchEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<TorchEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::Lagged { skipped: n });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let event = TorchEvent::ShakeDetected {
            magnitude: 21.5,
            timestamp: SystemTime::now(),
        };

        let subscriber_count = event_bus.publish(event).unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            TorchEvent::ShakeDetected { magnitude, .. } => assert_eq!(magnitude, 21.5),
            other => panic!("Unexpected event type: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());
        assert!(event_bus.publish(TorchEvent::ErrorCleared).is_err());

        // emit swallows the missing-subscriber error
        event_bus.emit(TorchEvent::ErrorCleared);
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let filter = EventFilter::EventTypes(vec!["mode_changed"]);
        let mut filtered_receiver =
            EventReceiver::new(event_bus.subscribe(), filter, "test".to_string());

        event_bus
            .publish(TorchEvent::TorchApplied {
                on: true,
                timestamp: SystemTime::now(),
            })
            .unwrap();
        event_bus
            .publish(TorchEvent::ModeChanged {
                mode: Mode::Strobe,
                timestamp: SystemTime::now(),
            })
            .unwrap();

        let received = timeout(Duration::from_millis(100), filtered_receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(received, TorchEvent::ModeChanged { mode: Mode::Strobe, .. }));
        assert!(filtered_receiver.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_event_properties() {
        let event = TorchEvent::MorseFinished { cancelled: true };
        assert_eq!(event.event_type(), "morse_finished");
        assert_eq!(event.description(), "Morse cancelled");

        let filter = EventFilter::Custom(|e| matches!(e, TorchEvent::ScreenTint { .. }));
        assert!(filter.matches(&TorchEvent::ScreenTint {
            color: "#ffffff".to_string(),
            opacity: 0.08,
        }));
        assert!(!filter.matches(&event));
    }
}
