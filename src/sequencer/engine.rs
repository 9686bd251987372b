use super::mode::Mode;
use super::morse::MorseProgram;
use super::schedule::{ScheduleHandle, ScheduleKind, Snapshot};
use super::tasks::{self, ScheduleContext};
use crate::advisor::MoodConfig;
use crate::audio::{AmplitudeProbe, SoundTrigger};
use crate::config::{
    parse_hex_color, SequencerConfig, TorchlightConfig, MAX_STROBE_INTERVAL_MS,
    MIN_STROBE_INTERVAL_MS,
};
use crate::control::ControlSender;
use crate::error::{Result, TorchError};
use crate::events::TorchEvent;
use crate::hardware::TorchDriver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info};

/// Result of a `transmit` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmitOutcome {
    Started { symbols: String },
    /// A transmission was running; it was stopped and nothing new started
    Cancelled,
}

struct RuntimeSettings {
    strobe_interval: Duration,
    screen_color: String,
    mood: Option<MoodConfig>,
}

/// State machine over mode and activity that owns the single schedule slot.
///
/// `on_mode_or_activity_changed` is the only way in: it tears the previous
/// schedule down, forces the torch off and builds the schedule for the new
/// combination. Torch-on writes only happen inside schedules, so a pending
/// acquisition never holds up a transition.
pub struct ModeSequencer {
    ctx: ScheduleContext,
    config: SequencerConfig,
    settings: Mutex<RuntimeSettings>,
    state: watch::Sender<Snapshot>,
    slot: AsyncMutex<Option<ScheduleHandle>>,
}

impl ModeSequencer {
    pub fn new(
        config: &TorchlightConfig,
        driver: TorchDriver,
        amplitude: Arc<dyn AmplitudeProbe>,
        control: ControlSender,
    ) -> Self {
        let sequencer = config.sequencer.clone();
        let (state, _) = watch::channel(Snapshot::default());

        Self {
            ctx: ScheduleContext {
                events: driver.events().clone(),
                driver,
                amplitude,
                sound_trigger: Arc::new(Mutex::new(SoundTrigger::new(&config.triggers))),
                control,
                gate_threshold: config.audio.gate_threshold,
                frame_interval: sequencer.frame_interval(),
            },
            settings: Mutex::new(RuntimeSettings {
                strobe_interval: clamp_strobe_interval(sequencer.strobe_interval_ms),
                screen_color: sequencer.screen_color.to_ascii_lowercase(),
                mood: None,
            }),
            config: sequencer,
            state,
            slot: AsyncMutex::new(None),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn driver(&self) -> &TorchDriver {
        &self.ctx.driver
    }

    pub fn strobe_interval(&self) -> Duration {
        self.settings.lock().strobe_interval
    }

    /// Store a new strobe interval, clamped to the supported range.
    /// Takes effect the next time Strobe is entered.
    pub fn set_strobe_interval(&self, interval_ms: u64) -> Duration {
        let interval = clamp_strobe_interval(interval_ms);
        self.settings.lock().strobe_interval = interval;
        debug!("Strobe interval set to {:?}", interval);
        interval
    }

    pub fn screen_color(&self) -> String {
        self.settings.lock().screen_color.clone()
    }

    /// Change the softlight color; re-publishes the tint while Steady is lit
    pub fn set_screen_color(&self, color: &str) -> Result<()> {
        let color = color.trim().to_ascii_lowercase();
        if parse_hex_color(&color).is_none() {
            return Err(TorchError::invalid_input(format!(
                "'{}' is not a #rrggbb color",
                color
            )));
        }
        self.settings.lock().screen_color = color.clone();

        let snapshot = self.snapshot();
        if snapshot.active && snapshot.mode == Mode::Steady {
            self.ctx.events.emit(TorchEvent::ScreenTint {
                color,
                opacity: self.config.screen_tint_opacity,
            });
        }
        Ok(())
    }

    pub fn mood(&self) -> Option<MoodConfig> {
        self.settings.lock().mood.clone()
    }

    /// Configuration used the next time Mood is entered
    pub fn set_mood(&self, mood: MoodConfig) {
        self.settings.lock().mood = Some(mood);
    }

    pub fn sound_trigger_enabled(&self) -> bool {
        self.ctx.sound_trigger.lock().is_enabled()
    }

    /// Enable or disable the clap trigger. An inactive Sound-reactive
    /// selection starts or stops listening accordingly.
    pub async fn set_sound_trigger(&self, enabled: bool) {
        self.ctx.sound_trigger.lock().set_enabled(enabled);
        info!(
            "Sound trigger {}",
            if enabled { "enabled" } else { "disabled" }
        );

        let snapshot = self.snapshot();
        if snapshot.mode == Mode::SoundReactive && !snapshot.active {
            self.on_mode_or_activity_changed(snapshot.mode, false).await;
        }
    }

    /// Per-bin levels (0-255) behind the latest amplitude sample
    pub fn spectrum(&self) -> Vec<u8> {
        self.ctx.amplitude.spectrum()
    }

    pub async fn is_transmitting(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .map_or(false, |handle| {
                handle.kind() == ScheduleKind::Transmission && !handle.is_finished()
            })
    }

    /// Re-enter the state machine for `mode` and `active`
    pub async fn on_mode_or_activity_changed(&self, mode: Mode, active: bool) {
        let mut slot = self.slot.lock().await;
        let next = Snapshot { mode, active };
        let previous = self.state.send_replace(next);

        if let Some(handle) = slot.take() {
            handle.cancel().await;
        }
        self.ctx.driver.set_torch(false).await;

        if previous.active && tints_screen(previous.mode) {
            self.ctx.events.emit(TorchEvent::ScreenTint {
                color: self.screen_color(),
                opacity: 0.0,
            });
        }

        let ctx = self.ctx.clone();
        let state = self.state.subscribe();

        if !active {
            if mode == Mode::SoundReactive && self.sound_trigger_enabled() {
                debug!("Listening for the sound trigger while inactive");
                *slot = Some(ScheduleHandle::spawn(
                    ScheduleKind::Pattern(mode),
                    next,
                    state,
                    move |guard| tasks::run_sound_trigger(ctx, guard),
                ));
            } else {
                debug!("Inactive in {} mode, torch off", mode);
            }
            return;
        }

        info!("Entering {} mode", mode);
        *slot = match mode {
            Mode::Steady => {
                self.ctx.events.emit(TorchEvent::ScreenTint {
                    color: self.screen_color(),
                    opacity: self.config.screen_tint_opacity,
                });
                Some(ScheduleHandle::spawn(
                    ScheduleKind::Pattern(mode),
                    next,
                    state,
                    move |guard| tasks::run_steady(ctx, guard),
                ))
            }
            Mode::Strobe => {
                let period = self.strobe_interval();
                Some(ScheduleHandle::spawn(
                    ScheduleKind::Pattern(mode),
                    next,
                    state,
                    move |guard| tasks::run_strobe(ctx, guard, period),
                ))
            }
            Mode::Sos => Some(ScheduleHandle::spawn(
                ScheduleKind::Pattern(mode),
                next,
                state,
                move |guard| tasks::run_sos(ctx, guard),
            )),
            Mode::Disco => {
                let period = self.config.disco_interval();
                Some(ScheduleHandle::spawn(
                    ScheduleKind::Pattern(mode),
                    next,
                    state,
                    move |guard| tasks::run_disco(ctx, guard, period),
                ))
            }
            Mode::SoundReactive => Some(ScheduleHandle::spawn(
                ScheduleKind::Pattern(mode),
                next,
                state,
                move |guard| tasks::run_sound_reactive(ctx, guard),
            )),
            Mode::Mood => match self.mood() {
                Some(mood) => Some(ScheduleHandle::spawn(
                    ScheduleKind::Pattern(mode),
                    next,
                    state,
                    move |guard| tasks::run_mood(ctx, guard, mood),
                )),
                None => {
                    info!("No mood configured, torch stays off");
                    None
                }
            },
            // Waits for an explicit transmit
            Mode::Morse => None,
        };
    }

    /// Transmit `message` in Morse. Calling while a transmission is running
    /// stops it, leaves the torch off and does not start `message`.
    pub async fn transmit(&self, message: &str) -> Result<TransmitOutcome> {
        self.transmit_program(MorseProgram::encode(message)).await
    }

    /// Transmit an already encoded dot/dash string
    pub async fn transmit_code(&self, code: &str) -> Result<TransmitOutcome> {
        self.transmit_program(MorseProgram::parse_code(code)?).await
    }

    async fn transmit_program(&self, program: MorseProgram) -> Result<TransmitOutcome> {
        let mut slot = self.slot.lock().await;

        let running = slot.as_ref().map_or(false, |handle| {
            handle.kind() == ScheduleKind::Transmission && !handle.is_finished()
        });
        if running {
            if let Some(handle) = slot.take() {
                handle.cancel().await;
            }
            self.ctx.driver.set_torch(false).await;
            return Ok(TransmitOutcome::Cancelled);
        }

        let snapshot = self.snapshot();
        if snapshot.mode != Mode::Morse || !snapshot.active {
            return Err(TorchError::invalid_input(
                "Morse transmission needs the torch active in Morse mode",
            ));
        }
        if program.is_empty() {
            return Err(TorchError::invalid_input("nothing to transmit"));
        }

        // A finished transmission still occupies the slot
        if let Some(handle) = slot.take() {
            handle.cancel().await;
        }

        let symbols = program.to_string();
        info!("Transmitting Morse: {}", symbols);
        self.ctx.events.emit(TorchEvent::MorseStarted {
            symbols: symbols.clone(),
        });

        let ctx = self.ctx.clone();
        let unit = self.config.morse_unit();
        *slot = Some(ScheduleHandle::spawn(
            ScheduleKind::Transmission,
            snapshot,
            self.state.subscribe(),
            move |guard| tasks::run_morse(ctx, guard, program, unit),
        ));

        Ok(TransmitOutcome::Started { symbols })
    }
}

fn tints_screen(mode: Mode) -> bool {
    matches!(mode, Mode::Steady | Mode::Disco | Mode::Mood)
}

pub fn clamp_strobe_interval(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms.clamp(MIN_STROBE_INTERVAL_MS, MAX_STROBE_INTERVAL_MS))
}
