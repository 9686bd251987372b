use super::detector::AccelSample;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stream of acceleration samples
#[async_trait]
pub trait MotionSource: Send + Sync {
    fn name(&self) -> &str;

    /// Ask for access to the sensor; resolves once access is known
    async fn request_permission(&self) -> Result<(), CaptureError>;

    async fn read(&self) -> Result<AccelSample, CaptureError>;
}

/// Accelerometer exposed by the Linux IIO subsystem
pub struct IioAccelerometer {
    name: String,
    dir: PathBuf,
}

impl IioAccelerometer {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            name: format!("iio:{}", dir.display()),
            dir,
        }
    }

    fn read_value(&self, file: &str) -> Result<f64, CaptureError> {
        let path = self.dir.join(file);
        let raw = fs::read_to_string(&path).map_err(|e| CaptureError::from_io(&self.name, &e))?;
        raw.trim().parse::<f64>().map_err(|e| CaptureError::NotReadable {
            device: self.name.clone(),
            details: format!("{}: {}", file, e),
        })
    }

    /// Shared `in_accel_scale`, falling back to per-axis scales, then 1.0
    fn scale(&self, axis: &str) -> f64 {
        self.read_value("in_accel_scale")
            .or_else(|_| self.read_value(&format!("in_accel_{}_scale", axis)))
            .unwrap_or(1.0)
    }
}

#[async_trait]
impl MotionSource for IioAccelerometer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request_permission(&self) -> Result<(), CaptureError> {
        for axis in ["x", "y", "z"] {
            self.read_value(&format!("in_accel_{}_raw", axis))?;
        }
        debug!("Accelerometer {} is readable", self.name);
        Ok(())
    }

    async fn read(&self) -> Result<AccelSample, CaptureError> {
        let mut values = [0.0; 3];
        for (value, axis) in values.iter_mut().zip(["x", "y", "z"]) {
            *value = self.read_value(&format!("in_accel_{}_raw", axis))? * self.scale(axis);
        }
        Ok(AccelSample::new(values[0], values[1], values[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_device(x: &str, y: &str, z: &str, scale: Option<&str>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in_accel_x_raw"), x).unwrap();
        fs::write(dir.path().join("in_accel_y_raw"), y).unwrap();
        fs::write(dir.path().join("in_accel_z_raw"), z).unwrap();
        if let Some(scale) = scale {
            fs::write(dir.path().join("in_accel_scale"), scale).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_reads_scaled_axes() {
        let dir = fake_device("100\n", "-200\n", "981\n", Some("0.01\n"));
        let accel = IioAccelerometer::new(dir.path());

        accel.request_permission().await.unwrap();
        let sample = accel.read().await.unwrap();
        assert!((sample.x - 1.0).abs() < 1e-9);
        assert!((sample.y + 2.0).abs() < 1e-9);
        assert!((sample.z - 9.81).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_per_axis_scale_and_default() {
        let dir = fake_device("10", "10", "10", None);
        fs::write(dir.path().join("in_accel_x_scale"), "0.5").unwrap();
        let accel = IioAccelerometer::new(dir.path());

        let sample = accel.read().await.unwrap();
        assert_eq!(sample, AccelSample::new(5.0, 10.0, 10.0));
    }

    #[tokio::test]
    async fn test_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let accel = IioAccelerometer::new(dir.path().join("iio:device9"));
        assert_eq!(
            accel.request_permission().await,
            Err(CaptureError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_garbage_value() {
        let dir = fake_device("abc", "0", "0", None);
        let accel = IioAccelerometer::new(dir.path());
        assert!(matches!(
            accel.read().await,
            Err(CaptureError::NotReadable { .. })
        ));
    }
}
