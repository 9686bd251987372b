use crate::config::TriggerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Acceleration including gravity, in m/s^2
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub const AT_REST: AccelSample = AccelSample {
        x: 0.0,
        y: 0.0,
        z: 9.81,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// `|x| + |y| + |z|`
    pub fn magnitude(&self) -> f64 {
        self.x.abs() + self.y.abs() + self.z.abs()
    }
}

/// Threshold detector with a re-arm interval between detections
#[derive(Debug, Clone)]
pub struct ShakeDetector {
    threshold: f64,
    rearm: Duration,
    last_fired: Option<Instant>,
}

impl ShakeDetector {
    pub fn new(config: &TriggerConfig) -> Self {
        Self::with_threshold(config.motion_threshold, config.motion_rearm())
    }

    pub fn with_threshold(threshold: f64, rearm: Duration) -> Self {
        Self {
            threshold,
            rearm,
            last_fired: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the magnitude when `sample` counts as a new shake
    pub fn check(&mut self, sample: AccelSample, now: Instant) -> Option<f64> {
        let magnitude = sample.magnitude();
        if !magnitude.is_finite() || magnitude <= self.threshold {
            return None;
        }
        if let Some(last) = self.last_fired {
            if now.duration_since(last) < self.rearm {
                return None;
            }
        }
        self.last_fired = Some(now);
        Some(magnitude)
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}
