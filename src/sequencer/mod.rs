mod engine;
mod mode;
mod morse;
mod patterns;
mod schedule;
mod tasks;


pub use engine::{clamp_strobe_interval, ModeSequencer, TransmitOutcome};
pub use mode::Mode;
pub use morse::{lookup as morse_lookup, MorseProgram, Symbol};
pub use patterns::{
    next_softlight_preset, sos_step, DISCO_PALETTE, DISCO_TINT_OPACITY, SOFTLIGHT_PRESETS,
    SOS_PATTERN_MS,
};
pub use schedule::{ScheduleHandle, ScheduleKind, Snapshot, StepGuard};
