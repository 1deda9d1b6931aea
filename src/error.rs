//! Error types for the background filter

use thiserror::Error;

/// Result type alias for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;

/// Coarse classification of a [`FilterError`], used for matching and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigValidation,
    PathSecurity,
    Integrity,
    UnsupportedFormat,
    Inference,
    Model,
    Io,
    Internal,
}

/// Errors raised by the filter core
///
/// None of these ever reach the host as a fault: the filter boundary turns them into a
/// pass-through frame or a failed load plus a log line.
#[derive(Error, Debug)]
pub enum FilterError {
    /// A tunable is outside its declared range
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// Traversal token, canonicalization failure, or a path outside the allow-list
    #[error("Path rejected: {0}")]
    PathSecurity(String),

    /// Missing, non-regular, oversized, or checksum-mismatched model artifact
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// Native pixel format the color bridge cannot convert
    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    /// Failure while preprocessing, executing, or postprocessing a single frame
    #[error("Inference error: {0}")]
    Inference(String),

    /// The inference engine could not parse or initialize an authorized artifact
    #[error("Model error: {0}")]
    Model(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FilterError {
    /// Create a new configuration validation error
    pub fn config_validation<S: Into<String>>(msg: S) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create a new path security error
    pub fn path_security<S: Into<String>>(msg: S) -> Self {
        Self::PathSecurity(msg.into())
    }

    /// Create a new integrity error
    pub fn integrity<S: Into<String>>(msg: S) -> Self {
        Self::Integrity(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
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

    /// Create configuration error with the valid range spelled out
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::ConfigValidation(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create inference error with provider context
    pub fn inference_error_with_provider(provider: &str, operation: &str, error: &str) -> Self {
        Self::Inference(format!(
            "{} failed using '{}' provider: {}",
            operation, provider, error
        ))
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigValidation(_) => ErrorKind::ConfigValidation,
            Self::PathSecurity(_) => ErrorKind::PathSecurity,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Inference(_) => ErrorKind::Inference,
            Self::Model(_) => ErrorKind::Model,
            Self::Io(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = FilterError::path_security("outside allow-list");
        assert!(matches!(err, FilterError::PathSecurity(_)));
        assert_eq!(err.kind(), ErrorKind::PathSecurity);

        let err = FilterError::unsupported_format("YUY2");
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_error_display() {
        let err = FilterError::integrity("checksum mismatch");
        assert_eq!(err.to_string(), "Integrity check failed: checksum mismatch");
    }

    #[test]
    fn test_contextual_errors() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = FilterError::file_io_error("hash model", Path::new("/models/u2net.onnx"), &io_error);
        assert_eq!(err.kind(), ErrorKind::Io);
        let error_string = err.to_string();
        assert!(error_string.contains("hash model"));
        assert!(error_string.contains("/models/u2net.onnx"));

        let err = FilterError::config_value_error("blur_amount", 51, "1-50");
        let error_string = err.to_string();
        assert!(error_string.contains("blur_amount"));
        assert!(error_string.contains("51"));
        assert!(error_string.contains("1-50"));

        let err = FilterError::inference_error_with_provider("CUDA", "Model inference", "out of memory");
        assert!(err.to_string().contains("'CUDA' provider"));
    }
}
