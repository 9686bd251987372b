use super::capture::{
    CaptureConstraints, CaptureDevice, CaptureTrack, FillLightMode, TorchCapabilities,
    TorchConstraint,
};
use crate::config::Facing;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Torch LEDs exposed through the kernel LED class (`/sys/class/leds`)
pub struct SysfsTorchDevice {
    name: String,
    leds_path: PathBuf,
}

#[derive(Debug, Clone)]
struct LedCandidate {
    name: String,
    dir: PathBuf,
    facing: Facing,
}

impl SysfsTorchDevice {
    pub fn new<P: AsRef<Path>>(leds_path: P) -> Self {
        let leds_path = leds_path.as_ref().to_path_buf();
        Self {
            name: format!("sysfs-leds:{}", leds_path.display()),
            leds_path,
        }
    }

    /// LED entries that look like a camera flash, torch entries first
    fn discover(&self) -> Result<Vec<LedCandidate>, CaptureError> {
        let entries = fs::read_dir(&self.leds_path)
            .map_err(|e| CaptureError::from_io(&self.leds_path.to_string_lossy(), &e))?;

        let mut candidates: Vec<LedCandidate> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let lower = name.to_ascii_lowercase();
                if !(lower.contains("torch") || lower.contains("flash")) {
                    return None;
                }
                Some(LedCandidate {
                    facing: infer_facing(&lower),
                    dir: entry.path(),
                    name,
                })
            })
            .collect();

        candidates.sort_by_key(|c| (!c.name.to_ascii_lowercase().contains("torch"), c.name.clone()));
        debug!(
            "Found {} torch LED candidates under {}",
            candidates.len(),
            self.leds_path.display()
        );
        Ok(candidates)
    }
}

/// Flash LEDs sit next to the rear camera unless named otherwise
fn infer_facing(lower_name: &str) -> Facing {
    if lower_name.contains("front") {
        Facing::User
    } else {
        Facing::Environment
    }
}

fn read_u32(path: &Path) -> std::io::Result<u32> {
    let raw = fs::read_to_string(path)?;
    raw.trim()
        .parse::<u32>()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[async_trait]
impl CaptureDevice for SysfsTorchDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureTrack>, CaptureError> {
        let mut candidates: Vec<LedCandidate> = self
            .discover()?
            .into_iter()
            .filter(|c| constraints.accepts(c.facing))
            .collect();

        if let Some(preferred) = constraints.preferred() {
            // Stable sort keeps the torch-first order within each facing
            candidates.sort_by_key(|c| c.facing != preferred);
        }

        let Some(candidate) = candidates.into_iter().next() else {
            return Err(match constraints {
                CaptureConstraints::Exact(_) => CaptureError::Overconstrained {
                    constraint: constraints.to_string(),
                },
                _ => CaptureError::NotFound,
            });
        };

        let brightness_path = candidate.dir.join("brightness");
        let max_brightness = read_u32(&candidate.dir.join("max_brightness"))
            .map_err(|e| CaptureError::from_io(&candidate.name, &e))?;

        // Opening for write proves we may drive the LED
        OpenOptions::new()
            .write(true)
            .open(&brightness_path)
            .map_err(|e| CaptureError::from_io(&candidate.name, &e))?;

        let has_trigger = candidate.dir.join("trigger").exists();
        info!(
            "Opened torch LED {} (max brightness {}, trigger control: {})",
            candidate.name, max_brightness, has_trigger
        );

        Ok(Box::new(SysfsTorchTrack {
            label: candidate.name,
            dir: candidate.dir,
            max_brightness,
            has_trigger,
            stopped: false,
        }))
    }
}

/// Lease on a single LED class device
pub struct SysfsTorchTrack {
    label: String,
    dir: PathBuf,
    max_brightness: u32,
    has_trigger: bool,
    stopped: bool,
}

impl SysfsTorchTrack {
    fn write_attribute(&self, attribute: &str, value: &str) -> Result<(), CaptureError> {
        let path = self.dir.join(attribute);
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| CaptureError::from_io(&self.label, &e))?;

        file.write_all(value.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| CaptureError::from_io(&self.label, &e))
    }
}

#[async_trait]
impl CaptureTrack for SysfsTorchTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_live(&self) -> bool {
        !self.stopped && self.dir.join("brightness").exists()
    }

    fn capabilities(&self) -> Option<TorchCapabilities> {
        Some(TorchCapabilities {
            torch: self.max_brightness > 0,
            fill_light_modes: if self.has_trigger {
                vec![FillLightMode::Off, FillLightMode::Flash]
            } else {
                Vec::new()
            },
        })
    }

    async fn apply_torch(&mut self, constraint: &TorchConstraint) -> Result<(), CaptureError> {
        if self.stopped {
            return Err(CaptureError::NotReadable {
                device: self.label.clone(),
                details: "track stopped".to_string(),
            });
        }

        if constraint.fill_light_mode.is_some() {
            // Detach kernel triggers so they cannot override the manual state
            self.write_attribute("trigger", "none")?;
        }

        let value = if constraint.torch { self.max_brightness } else { 0 };
        self.write_attribute("brightness", &value.to_string())?;
        debug!("LED {} brightness set to {}", self.label, value);
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        if let Err(e) = self.write_attribute("brightness", "0") {
            warn!("Failed to switch off {} while stopping: {}", self.label, e);
        }
        self.stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_led(root: &Path, name: &str, max_brightness: u32, trigger: bool) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("brightness"), "0").unwrap();
        fs::write(dir.join("max_brightness"), format!("{}\n", max_brightness)).unwrap();
        if trigger {
            fs::write(dir.join("trigger"), "[none] flash torch").unwrap();
        }
        dir
    }

    fn brightness(dir: &Path) -> String {
        fs::read_to_string(dir.join("brightness")).unwrap().trim().to_string()
    }

    #[tokio::test]
    async fn test_open_and_switch_torch() {
        let root = TempDir::new().unwrap();
        let led = fake_led(root.path(), "white:flash", 255, true);
        fake_led(root.path(), "input0::capslock", 1, false);

        let device = SysfsTorchDevice::new(root.path());
        let mut track = device.open(&CaptureConstraints::Any).await.unwrap();
        assert_eq!(track.label(), "white:flash");
        assert!(track.is_live());

        let caps = track.capabilities().unwrap();
        assert!(caps.torch);
        assert!(caps.supports_fill_light());

        track
            .apply_torch(&TorchConstraint::with_fill_light(true))
            .await
            .unwrap();
        assert_eq!(brightness(&led), "255");
        assert_eq!(fs::read_to_string(led.join("trigger")).unwrap(), "none");

        track.apply_torch(&TorchConstraint::torch_only(false)).await.unwrap();
        assert_eq!(brightness(&led), "0");

        track.apply_torch(&TorchConstraint::torch_only(true)).await.unwrap();
        track.stop();
        assert_eq!(brightness(&led), "0");
        assert!(!track.is_live());
    }

    #[tokio::test]
    async fn test_exact_facing_is_enforced() {
        let root = TempDir::new().unwrap();
        fake_led(root.path(), "front:flash", 100, false);

        let device = SysfsTorchDevice::new(root.path());
        let exact = device
            .open(&CaptureConstraints::Exact(Facing::Environment))
            .await;
        assert!(matches!(exact, Err(CaptureError::Overconstrained { .. })));

        let ideal = device
            .open(&CaptureConstraints::Ideal(Facing::Environment))
            .await
            .unwrap();
        assert_eq!(ideal.label(), "front:flash");
    }

    #[tokio::test]
    async fn test_torch_entries_preferred() {
        let root = TempDir::new().unwrap();
        fake_led(root.path(), "a:flash", 100, false);
        fake_led(root.path(), "led:torch", 100, false);

        let device = SysfsTorchDevice::new(root.path());
        let track = device.open(&CaptureConstraints::Any).await.unwrap();
        assert_eq!(track.label(), "led:torch");
        assert!(!track.capabilities().unwrap().supports_fill_light());
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let device = SysfsTorchDevice::new("/nonexistent/leds");
        let result = device.open(&CaptureConstraints::Any).await;
        assert!(matches!(result, Err(CaptureError::NotFound)));
    }

    #[tokio::test]
    async fn test_zero_max_brightness_reports_no_torch() {
        let root = TempDir::new().unwrap();
        fake_led(root.path(), "white:flash", 0, false);

        let device = SysfsTorchDevice::new(root.path());
        let track = device.open(&CaptureConstraints::Any).await.unwrap();
        assert!(!track.capabilities().unwrap().torch);
    }

    #[tokio::test]
    async fn test_removed_led_is_not_live() {
        let root = TempDir::new().unwrap();
        let led = fake_led(root.path(), "white:flash", 255, false);

        let device = SysfsTorchDevice::new(root.path());
        let track = device.open(&CaptureConstraints::Any).await.unwrap();
        fs::remove_dir_all(&led).unwrap();
        assert!(!track.is_live());
    }
}
