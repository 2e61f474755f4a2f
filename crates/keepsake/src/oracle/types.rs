//! Oracle verdict and error types

use serde::{Deserialize, Serialize};

use crate::memory::types::RetentionLevel;

/// Verdict returned by the semantic oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleVerdict {
    /// Retention tier the oracle suggests
    pub retention: RetentionLevel,
    /// Importance on a 0-30 scale
    pub importance: f64,
    /// Categories the oracle assigns
    pub categories: Vec<String>,
    /// The oracle's explanation
    pub reasoning: String,
}

impl OracleVerdict {
    pub fn new(
        retention: RetentionLevel,
        importance: f64,
        categories: Vec<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            retention,
            importance: importance.clamp(0.0, 30.0),
            categories,
            reasoning: reasoning.into(),
        }
    }
}

/// Oracle-specific errors
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle timeout")]
    Timeout,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Token budget exceeded")]
    BudgetExceeded,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for oracle operations
pub type Result<T> = std::result::Result<T, OracleError>;
