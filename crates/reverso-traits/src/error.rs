//! Error types for the Reverso pipeline.
//!
//! Null values produced by warm-up windows or degenerate cross-sections are
//! data, not errors. The variants below cover malformed input, failed
//! computations and the outer surfaces (files, optimizer, job scheduler).

use thiserror::Error;

/// The main error type for Reverso operations.
#[derive(Debug, Error)]
pub enum ReversoError {
    /// Error during signal computation.
    #[error("Signal computation failed: {0}")]
    SignalComputation(String),

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error when a date is out of range or invalid.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Error when a signal is not found.
    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The optimizer rejected the problem or failed to solve it.
    #[error("Optimization failed: {0}")]
    Optimization(String),

    /// Job submission to the batch scheduler failed.
    #[error("Job submission failed: {0}")]
    JobSubmission(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl From<String> for ReversoError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for ReversoError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for Reverso operations.
pub type Result<T> = std::result::Result<T, ReversoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReversoError::SignalComputation("test error".to_string());
        assert_eq!(err.to_string(), "Signal computation failed: test error");

        let err = ReversoError::MissingColumn("specific_risk".to_string());
        assert_eq!(err.to_string(), "Missing required column: specific_risk");

        let err = ReversoError::Config("PROJECT_ROOT is not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: PROJECT_ROOT is not set");
    }

    #[test]
    fn test_error_from_str() {
        let err: ReversoError = "boom".into();
        assert!(matches!(err, ReversoError::Other(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ReversoError = io.into();
        assert!(matches!(err, ReversoError::Io(_)));
    }
}
