//! Error types for the admissions NLU pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for NLU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pipeline construction and turn handling
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A static resource exists but its structure cannot be understood
    #[error("Corrupt resource {path}: {reason}")]
    CorruptResource { path: PathBuf, reason: String },

    /// External sequence tagger failure
    #[error("Tagger error: {0}")]
    Tagger(String),

    /// Word segmenter failure
    #[error("Segmenter error: {0}")]
    Segmenter(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session context error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl Error {
    /// Stable machine-readable code for callers that surface errors to users
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Csv(_) => "CSV_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::CorruptResource { .. } => "CORRUPT_RESOURCE",
            Error::Tagger(_) => "TAGGER_ERROR",
            Error::Segmenter(_) => "SEGMENTER_ERROR",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Session(_) => "CONTEXT_ERROR",
        }
    }
}

/// Session-context storage errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidInput("x".into()).code(), "INVALID_INPUT");
        let err = Error::from(SessionError::Storage("down".into()));
        assert_eq!(err.code(), "CONTEXT_ERROR");
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_corrupt_resource_message() {
        let err = Error::CorruptResource {
            path: PathBuf::from("data/entity.json"),
            reason: "expected array".to_string(),
        };
        assert!(err.to_string().contains("entity.json"));
        assert!(err.to_string().contains("expected array"));
    }
}
