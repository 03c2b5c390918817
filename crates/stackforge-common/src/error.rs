//! Unified error types for the Stackforge workspace.
//!
//! Expected bad input (unknown service ids, conflicts, malformed domains) is
//! reported as [`Diagnostic`](crate::diagnostic::Diagnostic) values, never as
//! an error. The variants below cover I/O, malformed data, and the two
//! caller-facing failure conditions raised by the orchestration layer.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackforgeError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration value: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Two catalog records share the same identifier.
    #[error("duplicate {kind} id: \"{id}\"")]
    DuplicateId {
        /// Type of the duplicated record.
        kind: &'static str,
        /// The duplicated identifier.
        id: String,
    },

    /// The resolved service graph carries hard errors.
    #[error("Invalid stack configuration: {}", .messages.join("; "))]
    InvalidConfiguration {
        /// Every underlying resolver error message.
        messages: Vec<String>,
    },

    /// Post-assembly validation reported hard errors.
    #[error("Validation failed: {}", .messages.join("; "))]
    ValidationFailed {
        /// Every underlying validator error message.
        messages: Vec<String>,
    },

    /// An operation that requires a valid resolved graph received an invalid one.
    #[error("operation requires a valid resolved graph")]
    InvalidGraph,

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_joins_all_messages() {
        let err = StackforgeError::InvalidConfiguration {
            messages: vec!["Unknown service: \"nope\"".into(), "A and B conflict".into()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid stack configuration: Unknown service: \"nope\"; A and B conflict"
        );
    }

    #[test]
    fn validation_failed_is_distinguishable() {
        let err = StackforgeError::ValidationFailed {
            messages: vec!["Port 80 is used twice".into()],
        };
        assert!(matches!(err, StackforgeError::ValidationFailed { .. }));
        assert!(err.to_string().starts_with("Validation failed:"));
    }

    #[test]
    fn yaml_errors_convert() {
        let parse: std::result::Result<serde_yaml::Value, _> = serde_yaml::from_str("a: [");
        let err: StackforgeError = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("YAML error"), "got: {err}");
    }
}
