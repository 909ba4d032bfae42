use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanviewError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("System error: {message}")]
    System { message: String },
}

impl ScanviewError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

/// Stable error codes surfaced to application code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerErrorCode {
    /// An operation needed a running controller
    ControllerUninitialized,
    /// The controller was already started by another owner
    ControllerAlreadyInitialized,
    /// The controller was used after being disposed
    ControllerDisposed,
    /// Camera permission was denied by the user or platform
    PermissionDenied,
    /// Scanning is not supported on this device
    Unsupported,
    /// Anything else
    GenericError,
}

impl std::fmt::Display for ScannerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScannerErrorCode::ControllerUninitialized => "controller_uninitialized",
            ScannerErrorCode::ControllerAlreadyInitialized => "controller_already_initialized",
            ScannerErrorCode::ControllerDisposed => "controller_disposed",
            ScannerErrorCode::PermissionDenied => "permission_denied",
            ScannerErrorCode::Unsupported => "unsupported",
            ScannerErrorCode::GenericError => "generic_error",
        };
        f.write_str(name)
    }
}

/// Optional platform payload attached to a failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Errors produced by the scan-window and detection core.
///
/// Every variant is cheap to clone so it can live inside the published
/// [`ScannerState`](crate::coordinator::ScannerState) as well as be returned
/// to the caller that triggered it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScannerError {
    #[error("Degenerate geometry: texture {texture}, widget {widget}")]
    DegenerateGeometry { texture: Size, widget: Size },

    #[error("Bridge error {code}: {}", .message.as_deref().unwrap_or("no message"))]
    Bridge {
        code: String,
        message: Option<String>,
        details: Option<serde_json::Value>,
    },

    #[error("Unknown scanner error: {}", .details.as_deref().unwrap_or("no details"))]
    Unknown { details: Option<String> },

    #[error("Scanner controller error: {code}")]
    Controller {
        code: ScannerErrorCode,
        details: Option<ErrorDetails>,
    },
}

impl ScannerError {
    pub fn controller(code: ScannerErrorCode) -> Self {
        Self::Controller {
            code,
            details: None,
        }
    }

    pub fn bridge<S: Into<String>>(code: S, message: Option<String>) -> Self {
        Self::Bridge {
            code: code.into(),
            message,
            details: None,
        }
    }

    /// Stable code for this error, regardless of where it came from
    pub fn error_code(&self) -> ScannerErrorCode {
        match self {
            ScannerError::DegenerateGeometry { .. } => ScannerErrorCode::GenericError,
            ScannerError::Bridge { code, .. } => {
                let upper = code.to_ascii_uppercase();
                if upper.contains("PERMISSION") || upper.contains("ACCESS_DENIED") {
                    ScannerErrorCode::PermissionDenied
                } else if upper.contains("UNSUPPORTED") {
                    ScannerErrorCode::Unsupported
                } else if upper.contains("ALREADY_STARTED") {
                    ScannerErrorCode::ControllerAlreadyInitialized
                } else {
                    ScannerErrorCode::GenericError
                }
            }
            ScannerError::Unknown { .. } => ScannerErrorCode::GenericError,
            ScannerError::Controller { code, .. } => *code,
        }
    }

    /// Whether calling start again may succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ScannerError::Controller {
                code: ScannerErrorCode::ControllerDisposed | ScannerErrorCode::Unsupported,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_code_classification() {
        let denied = ScannerError::bridge("CAMERA_ACCESS_DENIED", Some("nope".to_string()));
        assert_eq!(denied.error_code(), ScannerErrorCode::PermissionDenied);

        let permission = ScannerError::bridge("MOBILE_SCANNER_CAMERA_PERMISSION_DENIED", None);
        assert_eq!(permission.error_code(), ScannerErrorCode::PermissionDenied);

        let other = ScannerError::bridge("CAMERA_ERROR", None);
        assert_eq!(other.error_code(), ScannerErrorCode::GenericError);
    }

    #[test]
    fn test_disposed_is_not_recoverable() {
        assert!(!ScannerError::controller(ScannerErrorCode::ControllerDisposed).is_recoverable());
        assert!(ScannerError::bridge("CAMERA_ERROR", None).is_recoverable());
        assert!(ScannerError::Unknown { details: None }.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = ScannerError::bridge("CAMERA_ERROR", Some("busy".to_string()));
        assert_eq!(err.to_string(), "Bridge error CAMERA_ERROR: busy");
    }
}
