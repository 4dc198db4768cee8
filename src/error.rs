//! Error types with actionable diagnostics.
//!
//! Configuration-level errors are fatal at startup; batch-level errors
//! (`MalformedBatch`, `ShapeMismatch`) are absorbed by the trainer, which
//! skips the offending batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for entrenar-dual operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the dual-direction training stack.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValue { field: String, message: String },

    /// Dictionary file not found.
    #[error("Dictionary not found: {path}\n  → Check --data and the language codes")]
    DictionaryNotFound { path: PathBuf },

    /// Architecture tag missing from the model registry.
    #[error("Unknown architecture '{name}'\n  → Registered architectures: {available}")]
    UnknownArchitecture { name: String, available: String },

    /// Tensor shape mismatch.
    #[error("Tensor shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Batch that cannot be fed to one of the two directions.
    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    /// Checkpoint content does not fit the model it is restored into.
    #[error("Checkpoint error in {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create a configuration value error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue { field: field.into(), message: message.into() }
    }

    /// Batch-level errors are recoverable by skipping the batch.
    pub fn is_batch_local(&self) -> bool {
        matches!(self, Self::MalformedBatch(_) | Self::ShapeMismatch { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io("unspecified", source)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON: {e}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(format!("YAML: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_error_has_actionable_message() {
        let err = Error::DictionaryNotFound { path: "/data/dict.de".into() };
        let msg = err.to_string();
        assert!(msg.contains("dict.de"));
        assert!(msg.contains("--data"));
    }

    #[test]
    fn test_unknown_architecture_lists_available() {
        let err = Error::UnknownArchitecture {
            name: "lstm".to_string(),
            available: "attention, attention_tiny".to_string(),
        };
        assert!(err.to_string().contains("attention_tiny"));
    }

    #[test]
    fn test_batch_local_classification() {
        assert!(Error::MalformedBatch("empty".into()).is_batch_local());
        assert!(Error::ShapeMismatch { context: "x", expected: vec![1], actual: vec![2] }
            .is_batch_local());
        assert!(!Error::config("lr", "must be positive").is_batch_local());
    }

    #[test]
    fn test_io_error_conversion_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io("reading checkpoint", io);
        let msg = err.to_string();
        assert!(msg.contains("reading checkpoint"));
        assert!(msg.contains("gone"));
    }
}
