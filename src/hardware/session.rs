use super::capture::{CaptureConstraints, CaptureDevice, CaptureTrack, TorchConstraint};
use crate::config::HardwareConfig;
use crate::error::{CaptureError, Result, TorchError};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Counters describing what the session did to the hardware
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub acquisitions: u64,
    pub acquisition_attempts: u64,
    pub on_requests: u64,
    pub off_requests: u64,
    pub hardware_writes: u64,
    pub releases: u64,
}

/// Exclusive lease on the torch-capable capture track.
///
/// At most one track is held at a time. The track is acquired lazily on the
/// first turn-on request and reused while it stays live.
pub struct HardwareSession {
    device: Arc<dyn CaptureDevice>,
    constraints: Vec<CaptureConstraints>,
    fill_light_hint: bool,
    max_reacquire_attempts: u32,
    track: Option<Box<dyn CaptureTrack>>,
    last_applied: Option<bool>,
    stats: SessionStats,
}

impl HardwareSession {
    pub fn new(device: Arc<dyn CaptureDevice>, config: &HardwareConfig) -> Self {
        Self {
            device,
            constraints: CaptureConstraints::fallback_chain(config.facing),
            fill_light_hint: config.fill_light_hint,
            max_reacquire_attempts: config.max_reacquire_attempts,
            track: None,
            last_applied: None,
            stats: SessionStats::default(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.track.as_ref().map_or(false, |track| track.is_live())
    }

    /// Last torch state the hardware accepted on the current track
    pub fn last_applied(&self) -> Option<bool> {
        self.last_applied
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn constraints(&self) -> &[CaptureConstraints] {
        &self.constraints
    }

    /// Acquire a fresh track, walking the constraint fallback list in order
    pub async fn acquire(&mut self) -> Result<()> {
        self.release();

        let mut last_error: Option<CaptureError> = None;
        for constraints in &self.constraints {
            self.stats.acquisition_attempts += 1;
            debug!(
                "Opening {} with {} constraints",
                self.device.name(),
                constraints
            );

            match self.device.open(constraints).await {
                Ok(mut track) => {
                    if !track.is_live() {
                        warn!(
                            "Track {} opened with {} constraints is not live, discarding",
                            track.label(),
                            constraints
                        );
                        track.stop();
                        last_error = Some(CaptureError::NotReadable {
                            device: track.label().to_string(),
                            details: "track ended before it started".to_string(),
                        });
                        continue;
                    }

                    info!(
                        "Acquired torch track {} with {} constraints",
                        track.label(),
                        constraints
                    );
                    let mut pending = PendingTrack(Some(track));
                    if let Some(track) = pending.0.as_mut() {
                        if let Err(e) = track.attach_sink().await {
                            debug!("Sink playback for {} failed, continuing: {}", track.label(), e);
                        }
                    }

                    self.track = pending.into_track();
                    self.stats.acquisitions += 1;
                    return Ok(());
                }
                Err(e) => {
                    debug!("Acquisition with {} constraints failed: {}", constraints, e);
                    last_error = Some(e);
                }
            }
        }

        Err(self.classify_acquisition_failure(last_error))
    }

    fn classify_acquisition_failure(&self, error: Option<CaptureError>) -> TorchError {
        match error {
            Some(CaptureError::NotAllowed { device }) => {
                warn!("Access to {} was denied", device);
                TorchError::PermissionDenied { device }
            }
            Some(other) => {
                warn!("No usable capture track on {}: {}", self.device.name(), other);
                TorchError::HardwareUnavailable {
                    details: other.to_string(),
                }
            }
            None => TorchError::HardwareUnavailable {
                details: "no capture constraints configured".to_string(),
            },
        }
    }

    /// Switch the torch, acquiring a track first when turning on
    pub async fn apply(&mut self, on: bool) -> Result<()> {
        if on {
            self.stats.on_requests += 1;
        } else {
            self.stats.off_requests += 1;
        }

        let mut reacquire_budget = self.max_reacquire_attempts;
        loop {
            if on && !self.is_live() {
                self.acquire().await?;
            }

            if !on && self.track.is_some() && !self.is_live() {
                debug!("Dropping dead track while turning off");
                self.release();
            }

            let Some(track) = self.track.as_mut() else {
                trace!("No track held, nothing to switch off");
                return Ok(());
            };

            if self.last_applied == Some(on) {
                trace!("Torch already {}, skipping write", if on { "on" } else { "off" });
                return Ok(());
            }

            let capabilities = match track.capabilities() {
                Some(capabilities) if capabilities.torch => capabilities,
                _ => {
                    if on {
                        return Err(TorchError::HardwareUnsupported {
                            device: track.label().to_string(),
                        });
                    }
                    return Ok(());
                }
            };

            let primary = if self.fill_light_hint && capabilities.supports_fill_light() {
                TorchConstraint::with_fill_light(on)
            } else {
                TorchConstraint::torch_only(on)
            };

            let result = match track.apply_torch(&primary).await {
                Ok(()) => Ok(()),
                Err(e) if primary.fill_light_mode.is_some() => {
                    debug!("Torch constraint with fill light rejected ({}), retrying without", e);
                    track.apply_torch(&primary.reduced()).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    self.last_applied = Some(on);
                    self.stats.hardware_writes += 1;
                    debug!("Torch {}", if on { "on" } else { "off" });
                    return Ok(());
                }
                Err(e) => {
                    warn!("Torch write failed on {}: {}", track.label(), e);
                    if on && reacquire_budget > 0 {
                        reacquire_budget -= 1;
                        info!("Dropping stale torch track and reacquiring");
                        self.release();
                        continue;
                    }
                    return Err(TorchError::TransientApplyFailure {
                        details: e.to_string(),
                    });
                }
            }
        }
    }

    /// Stop the held track, if any
    pub fn release(&mut self) {
        if let Some(mut track) = self.track.take() {
            debug!("Releasing torch track {}", track.label());
            track.stop();
            self.stats.releases += 1;
        }
        self.last_applied = None;
    }
}

/// Track opened by an acquisition that has not been handed to the session
/// yet. Dropping it stops the track, so an abandoned acquisition leaves no
/// capture running.
struct PendingTrack(Option<Box<dyn CaptureTrack>>);

impl PendingTrack {
    fn into_track(mut self) -> Option<Box<dyn CaptureTrack>> {
        self.0.take()
    }
}

impl Drop for PendingTrack {
    fn drop(&mut self) {
        if let Some(mut track) = self.0.take() {
            debug!("Stopping track {} from an abandoned acquisition", track.label());
            track.stop();
        }
    }
}

impl Drop for HardwareSession {
    fn drop(&mut self) {
        self.release();
    }
}
