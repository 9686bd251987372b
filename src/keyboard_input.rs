use crate::control::{ControlRequest, ControlSender, TriggerSource};
use crate::error::Result;
use crate::sequencer::Mode;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Strobe interval change per `+`/`-` press
pub const STROBE_STEP_MS: i64 = 50;

/// Terminal key control for the controller
pub struct KeyboardInputHandler {
    control: ControlSender,
    morse_message: String,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(control: ControlSender, morse_message: String) -> Self {
        Self {
            control,
            morse_message,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler");

        let control = self.control.clone();
        let morse_message = self.morse_message.clone();
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a blocking task to handle keyboard input
        task::spawn_blocking(move || {
            // Enable raw mode to capture individual key presses
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        // Only handle key press events (not release)
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(request) = request_for_key(key_event.code, &morse_message) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };
                        let quitting = matches!(request, ControlRequest::Shutdown { .. });
                        if control.send(request).is_err() {
                            warn!("Controller stopped listening, keyboard handler exiting");
                            break;
                        }
                        if quitting {
                            info!("Quit key pressed - requesting shutdown");
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            // Disable raw mode when exiting
            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Ensure raw mode is disabled even if the task didn't clean up properly
        let _ = disable_raw_mode();

        Ok(())
    }
}

/// Request bound to `code`, if any
pub fn request_for_key(code: KeyCode, morse_message: &str) -> Option<ControlRequest> {
    let request = match code {
        KeyCode::Char(' ') => ControlRequest::ToggleActivity {
            source: TriggerSource::User,
        },
        KeyCode::Char(c @ '1'..='7') => ControlRequest::SelectMode(Mode::from_key(c)?),
        KeyCode::Char('+') | KeyCode::Char('=') => ControlRequest::AdjustStrobe(STROBE_STEP_MS),
        KeyCode::Char('-') => ControlRequest::AdjustStrobe(-STROBE_STEP_MS),
        KeyCode::Char('c') => ControlRequest::CycleScreenColor,
        KeyCode::Char('t') => ControlRequest::TransmitMessage(morse_message.to_string()),
        KeyCode::Char('m') => ControlRequest::ToggleMotionTrigger,
        KeyCode::Char('s') => ControlRequest::ToggleSoundTrigger,
        KeyCode::Char('q') | KeyCode::Esc => ControlRequest::Shutdown {
            reason: "User requested via keyboard".to_string(),
        },
        _ => return None,
    };
    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::control_channel;

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let (control, _rx) = control_channel();
        let handler = KeyboardInputHandler::new(control, "SOS".to_string());
        assert!(!handler.cancellation_token.is_cancelled());

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            request_for_key(KeyCode::Char(' '), "SOS"),
            Some(ControlRequest::ToggleActivity {
                source: TriggerSource::User
            })
        );
        assert_eq!(
            request_for_key(KeyCode::Char('3'), "SOS"),
            Some(ControlRequest::SelectMode(Mode::Sos))
        );
        assert_eq!(
            request_for_key(KeyCode::Char('-'), "SOS"),
            Some(ControlRequest::AdjustStrobe(-50))
        );
        assert_eq!(
            request_for_key(KeyCode::Char('t'), "HELLO"),
            Some(ControlRequest::TransmitMessage("HELLO".to_string()))
        );
        assert!(matches!(
            request_for_key(KeyCode::Esc, "SOS"),
            Some(ControlRequest::Shutdown { .. })
        ));
        assert_eq!(request_for_key(KeyCode::Char('8'), "SOS"), None);
        assert_eq!(request_for_key(KeyCode::Enter, "SOS"), None);
    }
}
