//! Error types for Keepsake

use thiserror::Error;

/// Main error type for Keepsake operations
#[derive(Error, Debug)]
pub enum KeepsakeError {
    /// Pattern catalog failed to load or compile (fatal at init)
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Configuration errors (fatal at init)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unparseable conversation input (skipped with a warning, never fatal)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Semantic oracle errors (recovered locally, the pattern verdict stands)
    #[error("Oracle error: {0}")]
    Oracle(#[from] crate::oracle::OracleError),

    /// Persistence backend errors (surfaced to the caller)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Keepsake operations
pub type Result<T> = std::result::Result<T, KeepsakeError>;
