use rand::Rng;
use std::time::Duration;

/// SOS in light pulses, milliseconds; even steps lit, odd steps dark
pub const SOS_PATTERN_MS: [u64; 18] = [
    200, 200, 200, 200, 200, 500, 600, 200, 600, 200, 600, 500, 200, 200, 200, 200, 200, 1000,
];

/// Screen colors flashed by the disco pattern
pub const DISCO_PALETTE: [&str; 8] = [
    "#ff0055", "#ffcc00", "#00ff88", "#00ccff", "#aa00ff", "#ff6600", "#ffffff", "#ff00cc",
];

/// Softlight presets for Steady mode
pub const SOFTLIGHT_PRESETS: [&str; 6] = [
    "#ffffff", "#fef9c3", "#fee2e2", "#dcfce7", "#dbeafe", "#f5d0fe",
];

pub const DISCO_TINT_OPACITY: f32 = 0.35;

/// One step of the SOS pattern
pub fn sos_step(index: usize) -> (bool, Duration) {
    let index = index % SOS_PATTERN_MS.len();
    (index % 2 == 0, Duration::from_millis(SOS_PATTERN_MS[index]))
}

pub fn random_disco_color() -> &'static str {
    let index = rand::rng().random_range(0..DISCO_PALETTE.len());
    DISCO_PALETTE[index]
}

/// Preset following `current`, wrapping; custom colors restart at the first preset
pub fn next_softlight_preset(current: &str) -> &'static str {
    let position = SOFTLIGHT_PRESETS
        .iter()
        .position(|preset| preset.eq_ignore_ascii_case(current));
    match position {
        Some(index) => SOFTLIGHT_PRESETS[(index + 1) % SOFTLIGHT_PRESETS.len()],
        None => SOFTLIGHT_PRESETS[0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_hex_color;

    #[test]
    fn test_sos_alternates_and_wraps() {
        for step in 0..36 {
            let (on, duration) = sos_step(step);
            assert_eq!(on, step % 2 == 0);
            assert_eq!(duration.as_millis() as u64, SOS_PATTERN_MS[step % 18]);
        }
        assert_eq!(sos_step(18), sos_step(0));
        assert_eq!(sos_step(17), (false, Duration::from_millis(1000)));
    }

    #[test]
    fn test_palettes_are_valid_colors() {
        assert!(DISCO_PALETTE.len() >= 6);
        for color in DISCO_PALETTE.iter().chain(SOFTLIGHT_PRESETS.iter()) {
            assert!(parse_hex_color(color).is_some(), "{}", color);
        }
        for _ in 0..50 {
            assert!(DISCO_PALETTE.contains(&random_disco_color()));
        }
    }

    #[test]
    fn test_softlight_cycle() {
        assert_eq!(next_softlight_preset("#ffffff"), "#fef9c3");
        assert_eq!(next_softlight_preset("#F5D0FE"), "#ffffff");
        assert_eq!(next_softlight_preset("#123456"), "#ffffff");
    }
}
