//! Custom error types for zerogate.
//!
//! Only configuration problems are errors in the `Result` sense. Anything
//! that goes wrong while a check runs (spawn failure, timeout, unparseable
//! output) is recorded on that check's [`CheckResult`](crate::CheckResult)
//! instead, so a valid configuration always produces a complete report.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for zerogate operations
#[derive(Error, Debug)]
pub enum GateError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// The check list is empty
    #[error("Configuration error: no checks configured")]
    EmptyCheckList,

    /// Two checks share a name
    #[error("Configuration error: duplicate check name '{name}'")]
    DuplicateCheckName { name: String },

    /// A check selected by name does not exist
    #[error("Configuration error: unknown check '{name}'")]
    UnknownCheck { name: String },

    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // History Errors
    // =========================================================================
    /// History log could not be read or written
    #[error("History log error at {path}: {message}")]
    History { path: PathBuf, message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML error wrapper
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GateError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error for a field
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a history error
    pub fn history(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::History {
            path: path.into(),
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error means the run never started because the
    /// configuration is malformed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyCheckList
                | Self::DuplicateCheckName { .. }
                | Self::UnknownCheck { .. }
                | Self::Config { .. }
                | Self::InvalidConfig { .. }
                | Self::Toml(_)
        )
    }

    /// Get error code for exit status
    ///
    /// `1` is reserved for a failed gate, so configuration errors exit
    /// with `2`.
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            2
        } else {
            1
        }
    }
}

/// Type alias for zerogate results
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GateError::DuplicateCheckName {
            name: "lint".into(),
        };
        assert!(err.to_string().contains("duplicate check name 'lint'"));
        assert!(GateError::EmptyCheckList
            .to_string()
            .contains("no checks configured"));
    }

    #[test]
    fn test_is_configuration() {
        assert!(GateError::EmptyCheckList.is_configuration());
        assert!(GateError::config("bad").is_configuration());
        assert!(GateError::invalid("check.lint", "missing command").is_configuration());
        assert!(!GateError::history("/tmp/h.jsonl", "locked").is_configuration());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(GateError::EmptyCheckList.exit_code(), 2);
        assert_eq!(
            GateError::UnknownCheck {
                name: "lint".into()
            }
            .exit_code(),
            2
        );
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(GateError::from(io_err).exit_code(), 1);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/test/zerogate.toml");
        let err = GateError::config_with_path("failed to parse", path.clone());
        if let GateError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_error_from_toml() {
        let parsed: std::result::Result<toml::Value, toml::de::Error> =
            toml::from_str("[settings\nmode = 1");
        let err: GateError = parsed.unwrap_err().into();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let gate_err: GateError = io_err.into();
        assert!(matches!(gate_err, GateError::Io(_)));
        assert!(gate_err.to_string().contains("access denied"));
    }
}
