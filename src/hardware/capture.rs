use crate::config::Facing;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::fmt;

/// One entry of the acquisition fallback list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureConstraints {
    /// Only a device facing this way is acceptable
    Exact(Facing),
    /// Prefer this facing, accept any device
    Ideal(Facing),
    /// Any device with a video track
    Any,
}

impl CaptureConstraints {
    /// Prioritized fallback list for a preferred facing
    pub fn fallback_chain(facing: Facing) -> Vec<CaptureConstraints> {
        vec![
            CaptureConstraints::Exact(facing),
            CaptureConstraints::Ideal(facing),
            CaptureConstraints::Any,
        ]
    }

    /// Whether a device facing `facing` satisfies this constraint
    pub fn accepts(&self, facing: Facing) -> bool {
        match self {
            CaptureConstraints::Exact(wanted) => *wanted == facing,
            CaptureConstraints::Ideal(_) | CaptureConstraints::Any => true,
        }
    }

    /// Preferred facing used to order candidates
    pub fn preferred(&self) -> Option<Facing> {
        match self {
            CaptureConstraints::Exact(facing) | CaptureConstraints::Ideal(facing) => Some(*facing),
            CaptureConstraints::Any => None,
        }
    }
}

impl fmt::Display for CaptureConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureConstraints::Exact(facing) => write!(f, "exact {:?}", facing),
            CaptureConstraints::Ideal(facing) => write!(f, "ideal {:?}", facing),
            CaptureConstraints::Any => write!(f, "any"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillLightMode {
    Off,
    Flash,
}

/// Typed result of the capability query on a track
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TorchCapabilities {
    pub torch: bool,
    pub fill_light_modes: Vec<FillLightMode>,
}

impl TorchCapabilities {
    pub fn supports_fill_light(&self) -> bool {
        !self.fill_light_modes.is_empty()
    }
}

/// Constraint applied to a track to switch the torch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorchConstraint {
    pub torch: bool,
    pub fill_light_mode: Option<FillLightMode>,
}

impl TorchConstraint {
    pub fn torch_only(on: bool) -> Self {
        Self {
            torch: on,
            fill_light_mode: None,
        }
    }

    pub fn with_fill_light(on: bool) -> Self {
        Self {
            torch: on,
            fill_light_mode: Some(if on {
                FillLightMode::Flash
            } else {
                FillLightMode::Off
            }),
        }
    }

    /// The same request without the secondary fill-light hint
    pub fn reduced(&self) -> Self {
        Self::torch_only(self.torch)
    }
}

/// A source of torch-capable capture tracks
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Open a track satisfying `constraints`
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureTrack>, CaptureError>;
}

/// Exclusive handle on one live capture track
#[async_trait]
pub trait CaptureTrack: Send {
    fn label(&self) -> &str;

    /// Whether the underlying hardware still backs this handle
    fn is_live(&self) -> bool;

    /// Capability descriptor, `None` when the platform cannot report one
    fn capabilities(&self) -> Option<TorchCapabilities>;

    /// Start a consuming sink so the capture is actually running.
    /// Platforms that do not need one keep the default.
    async fn attach_sink(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn apply_torch(&mut self, constraint: &TorchConstraint) -> Result<(), CaptureError>;

    /// Stop the track and release its hardware; must be idempotent
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_chain_order() {
        let chain = CaptureConstraints::fallback_chain(Facing::Environment);
        assert_eq!(
            chain,
            vec![
                CaptureConstraints::Exact(Facing::Environment),
                CaptureConstraints::Ideal(Facing::Environment),
                CaptureConstraints::Any,
            ]
        );
    }

    #[test]
    fn test_constraint_acceptance() {
        assert!(!CaptureConstraints::Exact(Facing::Environment).accepts(Facing::User));
        assert!(CaptureConstraints::Ideal(Facing::Environment).accepts(Facing::User));
        assert!(CaptureConstraints::Any.accepts(Facing::User));
        assert_eq!(CaptureConstraints::Any.preferred(), None);
    }

    #[test]
    fn test_reduced_constraint_drops_fill_light() {
        let primary = TorchConstraint::with_fill_light(true);
        assert_eq!(primary.fill_light_mode, Some(FillLightMode::Flash));
        assert_eq!(primary.reduced(), TorchConstraint::torch_only(true));
        assert_eq!(
            TorchConstraint::with_fill_light(false).fill_light_mode,
            Some(FillLightMode::Off)
        );
    }
}
