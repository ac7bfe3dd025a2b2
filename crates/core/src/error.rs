//! Error types for Argir
//!
//! This module defines the error type shared by every crate in the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::argument::ArgumentIdError;
use std::io;
use thiserror::Error;

/// Result type alias for Argir operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Argir
///
/// Only structural failures surface through this type. Per-document anomalies
/// (missing summary, missing secondary score) are recovered where they occur.
#[derive(Debug, Error)]
pub enum Error {
    /// An external collaborator failed while the engine was loading data
    #[error("Failed to load {what}: {message}")]
    LoadFailure {
        /// Which data set was being loaded (e.g. "proposals")
        what: &'static str,
        /// Underlying failure description
        message: String,
    },

    /// A record violates a data-model invariant
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A composite argument identifier could not be parsed
    #[error("Invalid argument id: {0}")]
    ArgumentId(#[from] ArgumentIdError),

    /// The full-text index could not be built
    #[error("Index error: {0}")]
    Index(String),

    /// Configuration is unreadable or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// An annotation could not be applied or persisted
    #[error("Annotation error: {0}")]
    Annotation(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wrap a collaborator failure as a load failure for `what`
    pub fn load_failure(what: &'static str, message: impl ToString) -> Self {
        Error::LoadFailure {
            what,
            message: message.to_string(),
        }
    }

    /// Whether this error came from an external collaborator at startup
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Error::LoadFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_load_failure() {
        let err = Error::load_failure("proposals", "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("Failed to load proposals"));
        assert!(msg.contains("connection refused"));
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_error_display_invalid_record() {
        let err = Error::InvalidRecord("url path must start with '/'".to_string());
        assert!(err.to_string().contains("Invalid record"));
        assert!(!err.is_load_failure());
    }

    #[test]
    fn test_error_from_argument_id() {
        let err: Error = ArgumentIdError::Empty.into();
        assert!(matches!(err, Error::ArgumentId(ArgumentIdError::Empty)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }
}
