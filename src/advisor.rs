use crate::config::parse_hex_color;
use crate::error::{Result, TorchError};
use crate::sequencer::MorseProgram;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const MAX_PULSE_SPEED_MS: u64 = 1000;

/// Lighting configuration generated from a mood description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodConfig {
    /// `#rrggbb` tint color
    pub color: String,
    /// Pulse period in milliseconds, 0 for a steady light
    pub pulse_speed: u64,
    /// Tint strength between 0 and 1
    pub intensity: f32,
    pub description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMoodConfig {
    color: String,
    pulse_speed: f64,
    intensity: f64,
    #[serde(default)]
    description: String,
}

impl MoodConfig {
    /// Parse the JSON object returned by a lighting service, clamping the
    /// numeric fields into range
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawMoodConfig = serde_json::from_str(json)?;
        Self::new(raw.color, raw.pulse_speed, raw.intensity, raw.description)
    }

    pub fn new(color: String, pulse_speed: f64, intensity: f64, description: String) -> Result<Self> {
        let color = color.trim().to_ascii_lowercase();
        if parse_hex_color(&color).is_none() {
            return Err(TorchError::invalid_input(format!(
                "mood color '{}' is not a #rrggbb color",
                color
            )));
        }

        let pulse_speed = if pulse_speed.is_finite() {
            pulse_speed.round().clamp(0.0, MAX_PULSE_SPEED_MS as f64) as u64
        } else {
            0
        };
        let intensity = if intensity.is_finite() {
            intensity.clamp(0.0, 1.0) as f32
        } else {
            0.0
        };

        Ok(Self {
            color,
            pulse_speed,
            intensity,
            description: description.trim().to_string(),
        })
    }

    /// Pulse period, `None` for a steady light
    pub fn pulse_period(&self) -> Option<Duration> {
        (self.pulse_speed > 0).then(|| Duration::from_millis(self.pulse_speed))
    }
}

/// External generation service for mood lighting and Morse text
#[async_trait]
pub trait LightingAdvisor: Send + Sync {
    async fn generate_lighting_from_mood(&self, prompt: &str) -> Result<MoodConfig>;

    /// Dot/dash rendering of `text`, letters separated by spaces
    async fn generate_morse_from_text(&self, text: &str) -> Result<String>;
}

/// Advisor used when no lighting service is configured
#[derive(Debug, Default, Clone)]
pub struct OfflineAdvisor;

#[async_trait]
impl LightingAdvisor for OfflineAdvisor {
    async fn generate_lighting_from_mood(&self, prompt: &str) -> Result<MoodConfig> {
        debug!("No lighting service for mood prompt '{}'", prompt);
        Err(TorchError::external("no lighting service configured"))
    }

    async fn generate_morse_from_text(&self, text: &str) -> Result<String> {
        Ok(MorseProgram::encode(text).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_from_json() {
        let mood = MoodConfig::from_json(
            r##"{"color":"#FF8800","pulseSpeed":420.4,"intensity":0.6,"description":" Warm campfire "}"##,
        )
        .unwrap();
        assert_eq!(mood.color, "#ff8800");
        assert_eq!(mood.pulse_speed, 420);
        assert!((mood.intensity - 0.6).abs() < f32::EPSILON);
        assert_eq!(mood.description, "Warm campfire");
        assert_eq!(mood.pulse_period(), Some(Duration::from_millis(420)));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mood = MoodConfig::from_json(
            r##"{"color":"#000000","pulseSpeed":5000,"intensity":3.5,"description":"x"}"##,
        )
        .unwrap();
        assert_eq!(mood.pulse_speed, MAX_PULSE_SPEED_MS);
        assert_eq!(mood.intensity, 1.0);

        let still = MoodConfig::from_json(
            r##"{"color":"#000000","pulseSpeed":-20,"intensity":-1,"description":"x"}"##,
        )
        .unwrap();
        assert_eq!(still.pulse_speed, 0);
        assert_eq!(still.intensity, 0.0);
        assert_eq!(still.pulse_period(), None);
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            MoodConfig::from_json(r#"{"color":"orange","pulseSpeed":1,"intensity":1}"#),
            Err(TorchError::InvalidInput { .. })
        ));
        assert!(matches!(
            MoodConfig::from_json("not json"),
            Err(TorchError::Serialization(_))
        ));
    }

    #[test]
    fn test_camel_case_round_trip() {
        let mood = MoodConfig::new("#112233".into(), 100.0, 0.5, "calm".into()).unwrap();
        let json = serde_json::to_string(&mood).unwrap();
        assert!(json.contains("\"pulseSpeed\":100"));
        assert_eq!(MoodConfig::from_json(&json).unwrap(), mood);
    }

    #[tokio::test]
    async fn test_offline_advisor() {
        let advisor = OfflineAdvisor;
        assert_eq!(
            advisor.generate_morse_from_text("sos").await.unwrap(),
            "... --- ..."
        );
        let err = advisor.generate_lighting_from_mood("cozy").await.unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::ExternalServiceFailure));
    }
}
