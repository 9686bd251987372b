use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lighting modes, exactly one of which is selected at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Steady,
    Strobe,
    Sos,
    Morse,
    Disco,
    SoundReactive,
    Mood,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Steady,
        Mode::Strobe,
        Mode::Sos,
        Mode::Morse,
        Mode::Disco,
        Mode::SoundReactive,
        Mode::Mood,
    ];

    /// Mode bound to a number key, `1` being Steady
    pub fn from_key(key: char) -> Option<Mode> {
        let index = key.to_digit(10)?.checked_sub(1)? as usize;
        Self::ALL.get(index).copied()
    }

    /// Whether entering the mode starts a timed schedule on its own
    pub fn is_scheduled(&self) -> bool {
        matches!(
            self,
            Mode::Strobe | Mode::Sos | Mode::Disco | Mode::SoundReactive | Mode::Mood
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Steady => "steady",
            Mode::Strobe => "strobe",
            Mode::Sos => "sos",
            Mode::Morse => "morse",
            Mode::Disco => "disco",
            Mode::SoundReactive => "sound_reactive",
            Mode::Mood => "mood",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "steady" | "normal" => Ok(Mode::Steady),
            "strobe" => Ok(Mode::Strobe),
            "sos" => Ok(Mode::Sos),
            "morse" => Ok(Mode::Morse),
            "disco" => Ok(Mode::Disco),
            "sound_reactive" | "sound" => Ok(Mode::SoundReactive),
            "mood" => Ok(Mode::Mood),
            _ => Err(format!("unknown mode '{}'", s)),
        }
    }
}
