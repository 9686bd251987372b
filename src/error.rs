use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TorchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Permission denied for {device}")]
    PermissionDenied { device: String },

    #[error("Hardware unavailable: {details}")]
    HardwareUnavailable { details: String },

    #[error("Torch control not supported by {device}")]
    HardwareUnsupported { device: String },

    #[error("Torch write failed: {details}")]
    TransientApplyFailure { details: String },

    #[error("Microphone unavailable: {details}")]
    MicrophoneRequired { details: String },

    #[error("Lighting service failed: {details}")]
    ExternalServiceFailure { details: String },

    #[error("Invalid input: {details}")]
    InvalidInput { details: String },

    #[error("System error: {message}")]
    System { message: String },
}

impl TorchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn invalid_input<S: Into<String>>(details: S) -> Self {
        Self::InvalidInput {
            details: details.into(),
        }
    }

    pub fn external<S: Into<String>>(details: S) -> Self {
        Self::ExternalServiceFailure {
            details: details.into(),
        }
    }

    /// Category shown in the user-facing error slot, if this error is user-facing
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            TorchError::PermissionDenied { .. } => Some(ErrorCategory::PermissionDenied),
            TorchError::HardwareUnavailable { .. } => Some(ErrorCategory::HardwareUnavailable),
            TorchError::HardwareUnsupported { .. } => Some(ErrorCategory::HardwareUnsupported),
            TorchError::TransientApplyFailure { .. } => Some(ErrorCategory::TransientApplyFailure),
            TorchError::MicrophoneRequired { .. } => Some(ErrorCategory::MicrophoneRequired),
            TorchError::ExternalServiceFailure { .. } => Some(ErrorCategory::ExternalServiceFailure),
            _ => None,
        }
    }

    /// Whether the user can recover by retrying the same action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TorchError::PermissionDenied { .. }
                | TorchError::HardwareUnavailable { .. }
                | TorchError::TransientApplyFailure { .. }
                | TorchError::MicrophoneRequired { .. }
                | TorchError::ExternalServiceFailure { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            TorchError::PermissionDenied { device } => {
                format!("Permission denied. Please allow access to {}.", device)
            }
            TorchError::HardwareUnavailable { .. } => "No camera detected.".to_string(),
            TorchError::HardwareUnsupported { .. } => {
                "Flashlight hardware not found.".to_string()
            }
            TorchError::TransientApplyFailure { .. } => {
                "Flashlight did not respond. Trying again.".to_string()
            }
            TorchError::MicrophoneRequired { .. } => {
                "Microphone access required for Beat mode.".to_string()
            }
            TorchError::ExternalServiceFailure { .. } => {
                "Lighting assistant is unavailable right now.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Fixed set of categories the error slot can display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    PermissionDenied,
    HardwareUnavailable,
    HardwareUnsupported,
    TransientApplyFailure,
    MicrophoneRequired,
    ExternalServiceFailure,
}

/// Failures reported by capture backends before classification
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("access to {device} was not allowed")]
    NotAllowed { device: String },

    #[error("no device matched the request")]
    NotFound,

    #[error("{device} is busy or unreadable: {details}")]
    NotReadable { device: String, details: String },

    #[error("constraint could not be satisfied: {constraint}")]
    Overconstrained { constraint: String },

    #[error("{0}")]
    Other(String),
}

impl CaptureError {
    /// Classify an io error raised while touching a device node
    pub fn from_io(device: &str, error: &std::io::Error) -> Self {
        match error.raw_os_error() {
            Some(code) if code == libc::EACCES || code == libc::EPERM => CaptureError::NotAllowed {
                device: device.to_string(),
            },
            Some(code) if code == libc::EBUSY => CaptureError::NotReadable {
                device: device.to_string(),
                details: error.to_string(),
            },
            Some(code) if code == libc::ENOENT || code == libc::ENODEV => CaptureError::NotFound,
            _ => match error.kind() {
                std::io::ErrorKind::PermissionDenied => CaptureError::NotAllowed {
                    device: device.to_string(),
                },
                std::io::ErrorKind::NotFound => CaptureError::NotFound,
                _ => CaptureError::Other(format!("{}: {}", device, error)),
            },
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CaptureError::NotAllowed { .. })
    }
}

/// Event bus failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Receiver lagged behind by {skipped} events")]
    Lagged { skipped: u64 },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, TorchError>;
