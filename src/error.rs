//! Error types for cutout pipeline operations

use serde::Serialize;
use thiserror::Error;

/// Result type alias for cutout pipeline operations
pub type Result<T> = std::result::Result<T, CutoutError>;

/// Comprehensive error types for the acquisition pipeline and its collaborators
#[derive(Error, Debug)]
pub enum CutoutError {
    /// Input/output errors (file not found, permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failures talking to the removal service
    #[error("Network error: {0}")]
    Network(String),

    /// The removal service answered with a non-success status
    #[error("Removal service returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// Base64 payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Image format or re-encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The image picker could not deliver a selection
    #[error("Picker error: {0}")]
    Picker(String),

    /// Local artifact storage rejected the write
    #[error("Storage error: {0}")]
    Storage(String),

    /// The navigation capability refused the transition
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CutoutError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new picker error
    pub fn picker<S: Into<String>>(msg: S) -> Self {
        Self::Picker(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new navigation error
    pub fn navigation<S: Into<String>>(msg: S) -> Self {
        Self::Navigation(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create network error with operation context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.into(), error))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }
}

/// Classification of a failed pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A selection was made but the picker could not deliver it
    PickerFailed,
    /// Remote call errored, timed out, or returned an empty payload
    RemovalFailed,
    /// Payload could not be decoded or written to local storage
    PersistenceFailed,
    /// Navigation capability rejected the screen transition
    NavigationFailed,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PickerFailed => write!(f, "picker failed"),
            Self::RemovalFailed => write!(f, "removal failed"),
            Self::PersistenceFailed => write!(f, "persistence failed"),
            Self::NavigationFailed => write!(f, "navigation failed"),
        }
    }
}

/// A recoverable pipeline failure, absorbed at the orchestrator boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineFailure {
    pub kind: FailureKind,
    /// Internal diagnostic detail (the underlying error text)
    pub message: String,
}

impl PipelineFailure {
    pub fn new<S: Into<String>>(kind: FailureKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_error(kind: FailureKind, error: &CutoutError) -> Self {
        Self::new(kind, error.to_string())
    }

    /// Short sentence suitable for showing to the person who picked the photo
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            FailureKind::PickerFailed => "That photo couldn't be opened. Please pick another one.",
            FailureKind::RemovalFailed => {
                "We couldn't remove the background from this photo. Please try again."
            },
            FailureKind::PersistenceFailed => {
                "The cutout couldn't be saved on this device. Check free space and try again."
            },
            FailureKind::NavigationFailed => "The editor couldn't be opened. Please try again.",
        }
    }
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = CutoutError::invalid_config("test config error");
        assert!(matches!(err, CutoutError::InvalidConfig(_)));

        let err = CutoutError::storage("disk full");
        assert!(matches!(err, CutoutError::Storage(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CutoutError::invalid_config("Invalid endpoint");
        assert_eq!(err.to_string(), "Invalid configuration: Invalid endpoint");

        let err = CutoutError::Remote {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Removal service returned HTTP 502: bad gateway"
        );
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = CutoutError::file_io_error("write cutout", Path::new("/data/cutout.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write cutout"));
        assert!(error_string.contains("/data/cutout.png"));
        if let CutoutError::Io(inner) = err {
            assert_eq!(inner.kind(), std::io::ErrorKind::PermissionDenied);
        } else {
            panic!("expected Io variant");
        }

        let err = CutoutError::config_value_error("picker quality", 1.5, "0.0-1.0", Some(0.2));
        let error_string = err.to_string();
        assert!(error_string.contains("picker quality"));
        assert!(error_string.contains("1.5"));
        assert!(error_string.contains("Recommended: 0.2"));

        let err = CutoutError::network_error("Failed to reach removal service", "connection refused");
        assert_eq!(
            err.to_string(),
            "Network error: Failed to reach removal service: connection refused"
        );
    }

    #[test]
    fn test_pipeline_failure_messages() {
        let failure = PipelineFailure::new(FailureKind::RemovalFailed, "timeout");
        assert_eq!(failure.to_string(), "removal failed: timeout");
        assert!(failure.user_message().contains("background"));

        let failure = PipelineFailure::from_error(
            FailureKind::PersistenceFailed,
            &CutoutError::storage("read-only filesystem"),
        );
        assert!(failure.message.contains("read-only filesystem"));
        assert!(failure.user_message().contains("saved"));
    }
}
