//! Deterministic mock oracle
//!
//! Returns verdicts derived purely from lexicon presence, so tests and
//! offline runs get reproducible classifications without a network call.

use async_trait::async_trait;

use crate::memory::types::RetentionLevel;
use crate::oracle::provider::OracleProvider;
use crate::oracle::types::{OracleVerdict, Result};

/// Mock provider with a fixed emotive lexicon
pub struct MockOracle {
    emotive_matcher: regex::Regex,
}

impl MockOracle {
    /// Build a mock around the configured emotive lexicon
    pub fn new(emotive_lexicon: &[String]) -> Result<Self> {
        let emotive_matcher = super::lexicon_matcher(emotive_lexicon)?;
        Ok(Self { emotive_matcher })
    }
}

#[async_trait]
impl OracleProvider for MockOracle {
    async fn classify(&self, text: &str) -> Result<OracleVerdict> {
        let lower = text.to_lowercase();

        if self.emotive_matcher.is_match(text) || lower.contains("phobia") {
            return Ok(OracleVerdict::new(
                RetentionLevel::LongTerm,
                18.0,
                vec!["mental_health".to_string(), "safety_concern".to_string()],
                "fear or trauma language detected",
            ));
        }

        if lower.contains("medication") || lower.contains("diagnosed") {
            return Ok(OracleVerdict::new(
                RetentionLevel::LongTerm,
                16.0,
                vec!["medical".to_string()],
                "implicit medical detail detected",
            ));
        }

        if lower.contains("keeps happening") || lower.contains("recurring") {
            return Ok(OracleVerdict::new(
                RetentionLevel::ShortTerm,
                12.0,
                vec!["pattern".to_string()],
                "recurring pattern language detected",
            ));
        }

        if ["hello", "hi ", "thanks", "bye"]
            .iter()
            .any(|g| lower.starts_with(g) || lower.contains(&format!(" {g}")))
        {
            return Ok(OracleVerdict::new(
                RetentionLevel::ImmediateDiscard,
                2.0,
                vec!["smalltalk".to_string()],
                "conversational filler",
            ));
        }

        Ok(OracleVerdict::new(
            RetentionLevel::ShortTerm,
            8.0,
            Vec::new(),
            "no strong semantic signal",
        ))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
