use super::{ShutdownReason, TorchController};
use crate::advisor::MoodConfig;
use crate::control::{ControlRequest, TriggerSource};
use crate::error::{Result, TorchError};
use crate::events::TorchEvent;
use crate::sequencer::{next_softlight_preset, Mode, TransmitOutcome};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

impl TorchController {
    /// Switch the whole utility on or off
    pub async fn set_active(&self, active: bool) {
        self.errors.clear();
        let snapshot = self.sequencer.snapshot();
        if snapshot.active == active {
            debug!("Already {}", if active { "active" } else { "inactive" });
            return;
        }

        self.sequencer
            .on_mode_or_activity_changed(snapshot.mode, active)
            .await;
        self.events.emit(TorchEvent::ActivityChanged {
            active,
            timestamp: SystemTime::now(),
        });
    }

    /// Flip activity, returning the new state
    pub async fn toggle(&self, source: TriggerSource) -> bool {
        let active = !self.is_active();
        info!("Activity toggled {} by {}", if active { "on" } else { "off" }, source);
        self.set_active(active).await;
        active
    }

    /// Select a mode; activity is kept as it is
    pub async fn select_mode(&self, mode: Mode) {
        self.errors.clear();
        let snapshot = self.sequencer.snapshot();
        if snapshot.mode == mode {
            return;
        }

        self.sequencer
            .on_mode_or_activity_changed(mode, snapshot.active)
            .await;
        self.events.emit(TorchEvent::ModeChanged {
            mode,
            timestamp: SystemTime::now(),
        });
    }

    /// Store a clamped strobe interval and restart a running strobe with it
    pub async fn set_strobe_interval(&self, interval_ms: u64) -> Duration {
        let interval = self.sequencer.set_strobe_interval(interval_ms);
        let snapshot = self.sequencer.snapshot();
        if snapshot.active && snapshot.mode == Mode::Strobe {
            self.sequencer
                .on_mode_or_activity_changed(Mode::Strobe, true)
                .await;
        }
        interval
    }

    pub async fn adjust_strobe(&self, delta_ms: i64) -> Duration {
        let current = self.sequencer.strobe_interval().as_millis() as i64;
        let target = current.saturating_add(delta_ms).max(0) as u64;
        self.set_strobe_interval(target).await
    }

    pub fn set_screen_color(&self, color: &str) -> Result<()> {
        self.sequencer.set_screen_color(color)
    }

    /// Move to the next softlight preset, returning it
    pub fn cycle_screen_color(&self) -> Result<String> {
        let next = next_softlight_preset(&self.sequencer.screen_color());
        self.sequencer.set_screen_color(next)?;
        Ok(next.to_string())
    }

    /// Transmit `message` in Morse. An inactive Morse selection is
    /// activated first; other modes reject the request.
    pub async fn transmit(&self, message: &str) -> Result<TransmitOutcome> {
        self.prepare_transmission().await;
        self.sequencer.transmit(message).await
    }

    /// Transmit an already encoded dot/dash string
    pub async fn transmit_code(&self, code: &str) -> Result<TransmitOutcome> {
        self.prepare_transmission().await;
        self.sequencer.transmit_code(code).await
    }

    /// Have the lighting advisor encode `text`, then transmit the result
    pub async fn transmit_via_advisor(&self, text: &str) -> Result<TransmitOutcome> {
        let code = match self.advisor.generate_morse_from_text(text).await {
            Ok(code) => code,
            Err(e) => return Err(self.report_advisor_failure(e)),
        };
        debug!("Advisor encoded '{}' as '{}'", text, code);
        self.transmit_code(&code).await
    }

    async fn prepare_transmission(&self) {
        let snapshot = self.sequencer.snapshot();
        if snapshot.mode == Mode::Morse && !snapshot.active {
            self.set_active(true).await;
        }
    }

    /// Ask the advisor for a mood and switch to it. A failed request leaves
    /// mode and activity untouched.
    pub async fn request_mood(&self, prompt: &str) -> Result<MoodConfig> {
        let mood = match self.advisor.generate_lighting_from_mood(prompt).await {
            Ok(mood) => mood,
            Err(e) => return Err(self.report_advisor_failure(e)),
        };

        info!("Applying mood '{}' ({})", mood.description, mood.color);
        self.errors.clear();
        self.sequencer.set_mood(mood.clone());
        self.events.emit(TorchEvent::MoodApplied {
            color: mood.color.clone(),
            description: mood.description.clone(),
        });

        let snapshot = self.sequencer.snapshot();
        self.sequencer
            .on_mode_or_activity_changed(Mode::Mood, true)
            .await;
        if snapshot.mode != Mode::Mood {
            self.events.emit(TorchEvent::ModeChanged {
                mode: Mode::Mood,
                timestamp: SystemTime::now(),
            });
        }
        if !snapshot.active {
            self.events.emit(TorchEvent::ActivityChanged {
                active: true,
                timestamp: SystemTime::now(),
            });
        }
        Ok(mood)
    }

    fn report_advisor_failure(&self, error: TorchError) -> TorchError {
        let error = match error {
            e @ TorchError::ExternalServiceFailure { .. } => e,
            other => TorchError::external(other.to_string()),
        };
        warn!("Lighting advisor failed: {}", error);
        self.errors.report(&error);
        error
    }

    /// Flip the shake trigger, returning whether it is now enabled
    pub async fn toggle_motion_trigger(&self) -> Result<bool> {
        self.motion.toggle().await
    }

    /// Flip the clap trigger, returning whether it is now enabled
    pub async fn toggle_sound_trigger(&self) -> bool {
        let enabled = !self.sequencer.sound_trigger_enabled();
        self.sequencer.set_sound_trigger(enabled).await;
        enabled
    }

    /// Apply one request; returns the reason when it asks to shut down
    pub async fn handle_request(&self, request: ControlRequest) -> Option<ShutdownReason> {
        debug!("Handling {:?}", request);
        match request {
            ControlRequest::ToggleActivity { source } => {
                self.toggle(source).await;
            }
            ControlRequest::SetActive(active) => self.set_active(active).await,
            ControlRequest::SelectMode(mode) => self.select_mode(mode).await,
            ControlRequest::AdjustStrobe(delta_ms) => {
                let interval = self.adjust_strobe(delta_ms).await;
                info!("Strobe interval {:?}", interval);
            }
            ControlRequest::CycleScreenColor => match self.cycle_screen_color() {
                Ok(color) => info!("Screen color {}", color),
                Err(e) => warn!("Could not change screen color: {}", e),
            },
            ControlRequest::TransmitMessage(message) => match self.transmit(&message).await {
                Ok(TransmitOutcome::Started { symbols }) => info!("Transmitting {}", symbols),
                Ok(TransmitOutcome::Cancelled) => info!("Transmission stopped"),
                Err(e) => warn!("Cannot transmit: {}", e),
            },
            ControlRequest::ToggleMotionTrigger => {
                if let Err(e) = self.toggle_motion_trigger().await {
                    warn!("Motion trigger unavailable: {}", e);
                }
            }
            ControlRequest::ToggleSoundTrigger => {
                self.toggle_sound_trigger().await;
            }
            ControlRequest::Shutdown { reason } => {
                info!("Shutdown requested: {}", reason);
                self.events.emit(TorchEvent::ShutdownRequested {
                    timestamp: SystemTime::now(),
                    reason: reason.clone(),
                });
                return Some(ShutdownReason::UserRequest(reason));
            }
        }
        None
    }
}
