use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Shortest strobe period the sequencer will run
pub const MIN_STROBE_INTERVAL_MS: u64 = 20;
/// Longest strobe period the sequencer will run
pub const MAX_STROBE_INTERVAL_MS: u64 = 1500;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TorchlightConfig {
    pub hardware: HardwareConfig,
    pub sequencer: SequencerConfig,
    pub audio: AudioConfig,
    pub triggers: TriggerConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HardwareBackend {
    Sysfs,
    Simulated,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Environment,
    User,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HardwareConfig {
    /// Torch backend to drive
    #[serde(default = "default_backend")]
    pub backend: HardwareBackend,

    /// LED class directory scanned for torch devices
    #[serde(default = "default_leds_path")]
    pub leds_path: String,

    /// Preferred camera facing for the torch
    #[serde(default = "default_facing")]
    pub facing: Facing,

    /// Send the fill-light hint alongside the torch constraint
    #[serde(default = "default_fill_light_hint")]
    pub fill_light_hint: bool,

    /// Fresh acquisitions attempted after an unexpected torch write failure
    #[serde(default = "default_max_reacquire_attempts")]
    pub max_reacquire_attempts: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SequencerConfig {
    /// Strobe toggle period in milliseconds
    #[serde(default = "default_strobe_interval")]
    pub strobe_interval_ms: u64,

    /// Disco toggle period in milliseconds
    #[serde(default = "default_disco_interval")]
    pub disco_interval_ms: u64,

    /// Morse base unit in milliseconds
    #[serde(default = "default_morse_unit")]
    pub morse_unit_ms: u64,

    /// Message sent by the keyboard transmit shortcut
    #[serde(default = "default_morse_message")]
    pub morse_message: String,

    /// Display refresh interval used by the sound-reactive loop
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,

    /// Softlight color shown while steady
    #[serde(default = "default_screen_color")]
    pub screen_color: String,

    /// Softlight overlay opacity while steady
    #[serde(default = "default_screen_tint_opacity")]
    pub screen_tint_opacity: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AudioConfig {
    /// Transform size; half of it is the number of frequency bins
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,

    /// Mean bin magnitude (0-255) above which the torch turns on
    #[serde(default = "default_gate_threshold")]
    pub gate_threshold: f32,

    /// Time smoothing applied to bin magnitudes
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,

    /// Magnitude mapped to 0
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,

    /// Magnitude mapped to 255
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,

    /// Input device name, default device when unset
    pub device: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TriggerConfig {
    /// Loud sounds flip activity while sound-reactive
    #[serde(default = "default_sound_enabled")]
    pub sound_enabled: bool,

    /// Amplitude (0-255) counted as a clap
    #[serde(default = "default_sound_threshold")]
    pub sound_threshold: f32,

    /// Minimum time between two sound triggers
    #[serde(default = "default_sound_rearm")]
    pub sound_rearm_ms: u64,

    /// Shaking the device flips activity
    #[serde(default = "default_motion_enabled")]
    pub motion_enabled: bool,

    /// |x|+|y|+|z| acceleration (m/s^2) counted as a shake
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold: f64,

    /// Minimum time between two shake triggers
    #[serde(default = "default_motion_rearm")]
    pub motion_rearm_ms: u64,

    /// IIO device directory of the accelerometer
    #[serde(default = "default_accelerometer_path")]
    pub accelerometer_path: String,

    /// Accelerometer polling period
    #[serde(default = "default_motion_poll")]
    pub motion_poll_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl SequencerConfig {
    pub fn strobe_interval(&self) -> Duration {
        Duration::from_millis(self.strobe_interval_ms)
    }

    pub fn disco_interval(&self) -> Duration {
        Duration::from_millis(self.disco_interval_ms)
    }

    pub fn morse_unit(&self) -> Duration {
        Duration::from_millis(self.morse_unit_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl TriggerConfig {
    pub fn sound_rearm(&self) -> Duration {
        Duration::from_millis(self.sound_rearm_ms)
    }

    pub fn motion_rearm(&self) -> Duration {
        Duration::from_millis(self.motion_rearm_ms)
    }

    pub fn motion_poll(&self) -> Duration {
        Duration::from_millis(self.motion_poll_ms)
    }
}

impl TorchlightConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("torchlight.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("hardware.backend", "sysfs")?
            .set_default("hardware.leds_path", default_leds_path())?
            .set_default("hardware.facing", "environment")?
            .set_default("hardware.fill_light_hint", default_fill_light_hint())?
            .set_default(
                "hardware.max_reacquire_attempts",
                default_max_reacquire_attempts(),
            )?
            .set_default("sequencer.strobe_interval_ms", default_strobe_interval())?
            .set_default("sequencer.disco_interval_ms", default_disco_interval())?
            .set_default("sequencer.morse_unit_ms", default_morse_unit())?
            .set_default("sequencer.morse_message", default_morse_message())?
            .set_default("sequencer.frame_interval_ms", default_frame_interval())?
            .set_default("sequencer.screen_color", default_screen_color())?
            .set_default(
                "sequencer.screen_tint_opacity",
                default_screen_tint_opacity() as f64,
            )?
            .set_default("audio.fft_size", default_fft_size() as i64)?
            .set_default("audio.gate_threshold", default_gate_threshold() as f64)?
            .set_default("audio.smoothing", default_smoothing() as f64)?
            .set_default("audio.min_decibels", default_min_decibels() as f64)?
            .set_default("audio.max_decibels", default_max_decibels() as f64)?
            .set_default("triggers.sound_enabled", default_sound_enabled())?
            .set_default("triggers.sound_threshold", default_sound_threshold() as f64)?
            .set_default("triggers.sound_rearm_ms", default_sound_rearm())?
            .set_default("triggers.motion_enabled", default_motion_enabled())?
            .set_default("triggers.motion_threshold", default_motion_threshold())?
            .set_default("triggers.motion_rearm_ms", default_motion_rearm())?
            .set_default("triggers.accelerometer_path", default_accelerometer_path())?
            .set_default("triggers.motion_poll_ms", default_motion_poll())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment overrides, e.g. TORCHLIGHT_SEQUENCER__STROBE_INTERVAL_MS
            .add_source(Environment::with_prefix("TORCHLIGHT").separator("__"))
            .build()?;

        let config: TorchlightConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let strobe = self.sequencer.strobe_interval_ms;
        if !(MIN_STROBE_INTERVAL_MS..=MAX_STROBE_INTERVAL_MS).contains(&strobe) {
            return Err(ConfigError::Message(format!(
                "Strobe interval must be between {} and {} ms",
                MIN_STROBE_INTERVAL_MS, MAX_STROBE_INTERVAL_MS
            )));
        }

        if self.sequencer.disco_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Disco interval must be greater than 0".to_string(),
            ));
        }

        if self.sequencer.morse_unit_ms == 0 {
            return Err(ConfigError::Message(
                "Morse unit must be greater than 0".to_string(),
            ));
        }

        if self.sequencer.frame_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Frame interval must be greater than 0".to_string(),
            ));
        }

        if parse_hex_color(&self.sequencer.screen_color).is_none() {
            return Err(ConfigError::Message(format!(
                "Screen color '{}' is not a #rrggbb color",
                self.sequencer.screen_color
            )));
        }

        if !(0.0..=1.0).contains(&self.sequencer.screen_tint_opacity) {
            return Err(ConfigError::Message(
                "Screen tint opacity must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.audio.fft_size < 32 || !self.audio.fft_size.is_power_of_two() {
            return Err(ConfigError::Message(
                "FFT size must be a power of two of at least 32".to_string(),
            ));
        }

        for (name, value) in [
            ("Gate threshold", self.audio.gate_threshold),
            ("Sound trigger threshold", self.triggers.sound_threshold),
        ] {
            if !(0.0..=255.0).contains(&value) {
                return Err(ConfigError::Message(format!(
                    "{} must be between 0 and 255",
                    name
                )));
            }
        }

        if !(0.0..1.0).contains(&self.audio.smoothing) {
            return Err(ConfigError::Message(
                "Smoothing must be in [0.0, 1.0)".to_string(),
            ));
        }

        if self.audio.min_decibels >= self.audio.max_decibels {
            return Err(ConfigError::Message(
                "min_decibels must be lower than max_decibels".to_string(),
            ));
        }

        if self.triggers.motion_threshold <= 0.0 {
            return Err(ConfigError::Message(
                "Motion threshold must be greater than 0".to_string(),
            ));
        }

        if self.triggers.motion_poll_ms == 0 {
            return Err(ConfigError::Message(
                "Motion poll interval must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for TorchlightConfig {
    fn default() -> Self {
        Self {
            hardware: HardwareConfig {
                backend: default_backend(),
                leds_path: default_leds_path(),
                facing: default_facing(),
                fill_light_hint: default_fill_light_hint(),
                max_reacquire_attempts: default_max_reacquire_attempts(),
            },
            sequencer: SequencerConfig {
                strobe_interval_ms: default_strobe_interval(),
                disco_interval_ms: default_disco_interval(),
                morse_unit_ms: default_morse_unit(),
                morse_message: default_morse_message(),
                frame_interval_ms: default_frame_interval(),
                screen_color: default_screen_color(),
                screen_tint_opacity: default_screen_tint_opacity(),
            },
            audio: AudioConfig::default(),
            triggers: TriggerConfig {
                sound_enabled: default_sound_enabled(),
                sound_threshold: default_sound_threshold(),
                sound_rearm_ms: default_sound_rearm(),
                motion_enabled: default_motion_enabled(),
                motion_threshold: default_motion_threshold(),
                motion_rearm_ms: default_motion_rearm(),
                accelerometer_path: default_accelerometer_path(),
                motion_poll_ms: default_motion_poll(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            gate_threshold: default_gate_threshold(),
            smoothing: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
            device: None,
        }
    }
}

/// Parse a `#rrggbb` color into its components
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

// Default value functions
fn default_backend() -> HardwareBackend {
    HardwareBackend::Sysfs
}
fn default_leds_path() -> String {
    "/sys/class/leds".to_string()
}
fn default_facing() -> Facing {
    Facing::Environment
}
fn default_fill_light_hint() -> bool {
    true
}
fn default_max_reacquire_attempts() -> u32 {
    1
}

fn default_strobe_interval() -> u64 {
    500
}
fn default_disco_interval() -> u64 {
    150
}
fn default_morse_unit() -> u64 {
    200
}
fn default_morse_message() -> String {
    "SOS".to_string()
}
fn default_frame_interval() -> u64 {
    16
} // ~60 Hz display refresh
fn default_screen_color() -> String {
    "#ffffff".to_string()
}
fn default_screen_tint_opacity() -> f32 {
    0.08
}

fn default_fft_size() -> usize {
    256
}
fn default_gate_threshold() -> f32 {
    45.0
}
fn default_smoothing() -> f32 {
    0.8
}
fn default_min_decibels() -> f32 {
    -100.0
}
fn default_max_decibels() -> f32 {
    -30.0
}

fn default_sound_enabled() -> bool {
    false
}
fn default_sound_threshold() -> f32 {
    88.0
}
fn default_sound_rearm() -> u64 {
    700
}
fn default_motion_enabled() -> bool {
    false
}
fn default_motion_threshold() -> f64 {
    18.0
}
fn default_motion_rearm() -> u64 {
    1200
}
fn default_accelerometer_path() -> String {
    "/sys/bus/iio/devices/iio:device0".to_string()
}
fn default_motion_poll() -> u64 {
    20
}

fn default_event_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TorchlightConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sequencer.morse_unit(), Duration::from_millis(200));
        assert_eq!(config.audio.gate_threshold, 45.0);
    }

    #[test]
    fn test_audio_section_defaults() {
        let audio = AudioConfig::default();
        assert_eq!(audio, TorchlightConfig::default().audio);
        assert_eq!(audio.fft_size, 256);
        assert_eq!(audio.gate_threshold, 45.0);
        assert!(audio.device.is_none());
    }

    #[test]
    fn test_load_from_file_with_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[hardware]\nbackend = \"simulated\"\n\n[sequencer]\nstrobe_interval_ms = 250\n"
        )
        .unwrap();

        let config = TorchlightConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.hardware.backend, HardwareBackend::Simulated);
        assert_eq!(config.sequencer.strobe_interval_ms, 250);
        // Untouched sections keep their defaults
        assert_eq!(config.sequencer.disco_interval_ms, 150);
        assert_eq!(config.triggers.sound_threshold, 88.0);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = TorchlightConfig::load_from_file("/nonexistent/torchlight.toml").unwrap();
        assert_eq!(config, TorchlightConfig::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TorchlightConfig::default();

        config.sequencer.strobe_interval_ms = 5;
        assert!(config.validate().is_err());
        config.sequencer.strobe_interval_ms = 1500;
        assert!(config.validate().is_ok());

        config.sequencer.screen_color = "white".to_string();
        assert!(config.validate().is_err());
        config.sequencer.screen_color = "#fef9c3".to_string();
        assert!(config.validate().is_ok());

        config.audio.fft_size = 100;
        assert!(config.validate().is_err());
        config.audio.fft_size = 256;

        config.triggers.sound_threshold = 300.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some((255, 128, 0)));
        assert_eq!(parse_hex_color("ff8000"), None);
        assert_eq!(parse_hex_color("#ff80"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }
}
