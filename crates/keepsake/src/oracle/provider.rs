//! Oracle provider trait
//!
//! Abstracts the semantic classification backend (remote API or the
//! deterministic mock used for tests and offline runs).

use async_trait::async_trait;

use crate::oracle::types::{OracleVerdict, Result};

/// Backend that classifies a single utterance semantically
#[async_trait]
pub trait OracleProvider: Send + Sync {
    /// Classify the utterance and return a structured verdict
    async fn classify(&self, text: &str) -> Result<OracleVerdict>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
