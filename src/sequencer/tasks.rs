use super::morse::MorseProgram;
use super::patterns::{random_disco_color, sos_step, DISCO_TINT_OPACITY};
use super::schedule::StepGuard;
use crate::advisor::MoodConfig;
use crate::audio::{AmplitudeProbe, SoundTrigger};
use crate::control::{ControlRequest, ControlSender, TriggerSource};
use crate::events::{EventBus, TorchEvent};
use crate::hardware::TorchDriver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Everything a running schedule needs, cloned into its task
#[derive(Clone)]
pub(super) struct ScheduleContext {
    pub driver: TorchDriver,
    pub events: EventBus,
    pub amplitude: Arc<dyn AmplitudeProbe>,
    pub sound_trigger: Arc<Mutex<SoundTrigger>>,
    pub control: ControlSender,
    pub gate_threshold: f32,
    pub frame_interval: Duration,
}

/// Apply `on` unless the schedule is cancelled first; false once cancelled.
/// Dropping the pending write also abandons an acquisition it waits on.
async fn apply(ctx: &ScheduleContext, guard: &StepGuard, on: bool) -> bool {
    tokio::select! {
        _ = guard.cancelled() => false,
        _ = ctx.driver.set_torch(on) => true,
    }
}

/// Flip the torch every `period`, starting dark
async fn toggle_every<F>(ctx: &ScheduleContext, guard: &StepGuard, period: Duration, mut on_lit: F)
where
    F: FnMut() + Send,
{
    let mut lit = false;
    while guard.sleep(period).await {
        lit = !lit;
        if lit {
            on_lit();
        }
        if !apply(ctx, guard, lit).await {
            break;
        }
    }
}

pub(super) async fn run_steady(ctx: ScheduleContext, guard: StepGuard) {
    if guard.holds() && apply(&ctx, &guard, true).await {
        trace!("Steady light requested");
    }
}

pub(super) async fn run_strobe(ctx: ScheduleContext, guard: StepGuard, period: Duration) {
    debug!("Strobe every {:?}", period);
    toggle_every(&ctx, &guard, period, || {}).await;
}

pub(super) async fn run_disco(ctx: ScheduleContext, guard: StepGuard, period: Duration) {
    let events = ctx.events.clone();
    toggle_every(&ctx, &guard, period, || {
        let color = random_disco_color();
        trace!("Disco color {}", color);
        events.emit(TorchEvent::ScreenTint {
            color: color.to_string(),
            opacity: DISCO_TINT_OPACITY,
        });
    })
    .await;
}

pub(super) async fn run_sos(ctx: ScheduleContext, guard: StepGuard) {
    let mut step = 0;
    loop {
        if !guard.holds() {
            break;
        }
        let (lit, duration) = sos_step(step);
        if !apply(&ctx, &guard, lit).await || !guard.sleep(duration).await {
            break;
        }
        step = (step + 1) % super::patterns::SOS_PATTERN_MS.len();
    }
}

pub(super) async fn run_mood(ctx: ScheduleContext, guard: StepGuard, mood: MoodConfig) {
    if !guard.holds() {
        return;
    }
    ctx.events.emit(TorchEvent::ScreenTint {
        color: mood.color.clone(),
        opacity: mood.intensity,
    });
    if !apply(&ctx, &guard, true).await {
        return;
    }

    let Some(period) = mood.pulse_period() else {
        debug!("Mood '{}' holds a steady light", mood.description);
        return;
    };

    let mut lit = true;
    while guard.sleep(period).await {
        lit = !lit;
        if !apply(&ctx, &guard, lit).await {
            break;
        }
    }
}

/// Open the microphone for a schedule; false when cancelled or unavailable
async fn start_microphone(ctx: &ScheduleContext, guard: &StepGuard) -> bool {
    let started = tokio::select! {
        _ = guard.cancelled() => return false,
        result = ctx.amplitude.start() => result,
    };
    match started {
        Ok(()) => true,
        Err(e) => {
            warn!("Microphone cannot start: {}", e);
            ctx.driver.errors().report(&e);
            false
        }
    }
}

/// Wait for the next frame; false once the schedule no longer holds
async fn next_frame(guard: &StepGuard, frames: &mut Interval) -> bool {
    tokio::select! {
        _ = guard.cancelled() => return false,
        _ = frames.tick() => {}
    }
    guard.holds()
}

fn frame_timer(period: Duration) -> Interval {
    let mut frames = tokio::time::interval(period);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    frames
}

/// Fire the clap trigger for `amplitude` if it is armed; the controller
/// flips activity in response
fn check_sound_trigger(ctx: &ScheduleContext, amplitude: f32) -> bool {
    let fired = ctx.sound_trigger.lock().check(amplitude, Instant::now());
    if !fired {
        return false;
    }

    info!("Sound trigger fired at amplitude {:.1}", amplitude);
    ctx.events.emit(TorchEvent::SoundTriggered {
        amplitude,
        timestamp: SystemTime::now(),
    });
    let request = ControlRequest::ToggleActivity {
        source: TriggerSource::Sound,
    };
    if ctx.control.send(request).is_err() {
        debug!("Controller is gone, dropping sound trigger");
    }
    true
}

/// Per-frame amplitude gate. Exits on its own once the mode or activity
/// no longer match.
pub(super) async fn run_sound_reactive(ctx: ScheduleContext, guard: StepGuard) {
    if !start_microphone(&ctx, &guard).await {
        return;
    }

    let mut frames = frame_timer(ctx.frame_interval);
    let mut lit: Option<bool> = None;

    while next_frame(&guard, &mut frames).await {
        let amplitude = ctx.amplitude.sample();
        if check_sound_trigger(&ctx, amplitude) {
            continue;
        }

        let want = amplitude > ctx.gate_threshold;
        if lit != Some(want) {
            if !apply(&ctx, &guard, want).await {
                break;
            }
            lit = Some(want);
        }
    }

    ctx.amplitude.stop();
}

/// Trigger-only listening while Sound-reactive is selected but inactive, so
/// a clap can switch the light back on. Never touches the torch.
pub(super) async fn run_sound_trigger(ctx: ScheduleContext, guard: StepGuard) {
    if !start_microphone(&ctx, &guard).await {
        return;
    }

    let mut frames = frame_timer(ctx.frame_interval);
    while next_frame(&guard, &mut frames).await {
        let amplitude = ctx.amplitude.sample();
        check_sound_trigger(&ctx, amplitude);
    }

    ctx.amplitude.stop();
}

pub(super) async fn run_morse(
    ctx: ScheduleContext,
    guard: StepGuard,
    program: MorseProgram,
    unit: Duration,
) {
    let completed = play_program(&ctx, &guard, &program, unit).await;
    if completed {
        ctx.driver.set_torch(false).await;
        info!("Morse transmission complete");
    } else {
        info!("Morse transmission cancelled");
    }
    ctx.events.emit(TorchEvent::MorseFinished {
        cancelled: !completed,
    });
}

async fn play_program(
    ctx: &ScheduleContext,
    guard: &StepGuard,
    program: &MorseProgram,
    unit: Duration,
) -> bool {
    for symbol in program.symbols() {
        if !guard.holds() {
            return false;
        }
        let (lit, dark) = symbol.timing();
        if lit > 0 {
            if !apply(ctx, guard, true).await || !guard.sleep(unit * lit).await {
                return false;
            }
            if !apply(ctx, guard, false).await {
                return false;
            }
        }
        if !guard.sleep(unit * dark).await {
            return false;
        }
    }
    true
}
