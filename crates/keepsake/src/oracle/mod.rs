//! Semantic oracle fallback (layer 2)
//!
//! Consulted only for utterances the pattern scorer is unsure about:
//! borderline scores, or emotive language with no strong medical match.
//! Verdicts are cached by normalized text, calls are bounded by a token
//! budget, and every failure degrades to the layer-1 verdict.

pub mod cache;
pub mod mock;
pub mod provider;
pub mod remote;
pub mod types;

pub use cache::{cache_key, VerdictCache};
pub use mock::MockOracle;
pub use provider::OracleProvider;
pub use remote::RemoteOracle;
pub use types::{OracleError, OracleVerdict};

use regex::{escape, Regex, RegexBuilder};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::memory::types::RetentionLevel;
use crate::scoring::ScoreBreakdown;

/// Categories whose strong matches suppress the emotive gate
const MEDICAL_CATEGORIES: &[&str] = &[
    "medical",
    "mental_health",
    "emergency",
    "allergy",
    "medical_treatment",
    "medical_equipment",
];

/// Pattern weight at or above which a medical match counts as strong
const STRONG_MEDICAL_WEIGHT: i32 = 15;

/// Raw score below which an oracle discard verdict downgrades the item
const DISCARD_RAW_CEILING: i64 = 8;

/// Rough token estimate added per call on top of the text itself
const CALL_TOKEN_OVERHEAD: u64 = 256;

/// Usage counters for the oracle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleUsage {
    pub calls: u64,
    pub cache_hits: u64,
    pub errors: u64,
    pub tokens_spent: u64,
}

/// How an oracle verdict changed the layer-1 result
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub retention: RetentionLevel,
    pub adjusted_score: f64,
    /// Score delta attributable to the oracle (zero when layer 1 stands)
    pub delta: f64,
    pub note: String,
}

/// Gating, caching, budgeting wrapper around an oracle provider
pub struct SemanticOracle {
    provider: Box<dyn OracleProvider>,
    cache: VerdictCache,
    emotive_matcher: regex::Regex,
    timeout: Duration,
    token_budget: u64,
    tokens_spent: AtomicU64,
    budget_exhausted: AtomicBool,
    calls: AtomicU64,
    cache_hits: AtomicU64,
    errors: AtomicU64,
}

impl SemanticOracle {
    /// Build the oracle from configuration
    ///
    /// Returns `None` when the oracle is disabled. In mock mode the
    /// deterministic provider is used; otherwise the remote one.
    pub fn from_config(config: &OracleConfig) -> Result<Option<Self>, OracleError> {
        if !config.enabled {
            return Ok(None);
        }

        let provider: Box<dyn OracleProvider> = if config.mock_mode {
            Box::new(MockOracle::new(&config.emotive_lexicon)?)
        } else {
            Box::new(RemoteOracle::new(config)?)
        };

        Ok(Some(Self::new(provider, config)?))
    }

    /// Build the oracle around an explicit provider
    pub fn new(provider: Box<dyn OracleProvider>, config: &OracleConfig) -> Result<Self, OracleError> {
        let emotive_matcher = lexicon_matcher(&config.emotive_lexicon)?;

        Ok(Self {
            provider,
            cache: VerdictCache::new(config.cache_max_entries),
            emotive_matcher,
            timeout: Duration::from_millis(config.timeout_ms),
            token_budget: config.monthly_token_budget,
            tokens_spent: AtomicU64::new(0),
            budget_exhausted: AtomicBool::new(false),
            calls: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }

    /// Whether this utterance should be escalated to the oracle
    pub fn should_consult(&self, text: &str, breakdown: &ScoreBreakdown) -> bool {
        if breakdown.borderline {
            return true;
        }

        let strong_medical = breakdown.matched.iter().any(|m| {
            m.weight >= STRONG_MEDICAL_WEIGHT && MEDICAL_CATEGORIES.contains(&m.category.as_str())
        });

        self.emotive_matcher.is_match(text) && !strong_medical
    }

    /// Classify through cache, budget, and timeout
    ///
    /// `None` means the layer-1 verdict stands: either the budget is
    /// exhausted, the call timed out, or transport failed. Errors are
    /// counted, never raised.
    pub async fn classify(&self, text: &str) -> Option<OracleVerdict> {
        if let Some(hit) = self.cache.get(text) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!("Oracle cache hit");
            return Some(hit);
        }

        if self.budget_exhausted.load(Ordering::Relaxed) {
            return None;
        }

        let estimated_tokens = (text.len() as u64) / 4 + CALL_TOKEN_OVERHEAD;
        if self.tokens_spent.load(Ordering::Relaxed) + estimated_tokens > self.token_budget {
            if !self.budget_exhausted.swap(true, Ordering::Relaxed) {
                warn!("Oracle token budget exhausted, disabling for the rest of the process");
            }
            return None;
        }

        let outcome = tokio::time::timeout(self.timeout, self.provider.classify(text)).await;
        match outcome {
            Ok(Ok(verdict)) => {
                self.calls.fetch_add(1, Ordering::Relaxed);
                self.tokens_spent.fetch_add(estimated_tokens, Ordering::Relaxed);
                self.cache.put(text, verdict.clone());
                Some(verdict)
            }
            Ok(Err(e)) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!("Oracle call failed, keeping pattern verdict: {}", e);
                None
            }
            Err(_) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!("Oracle call timed out after {:?}", self.timeout);
                None
            }
        }
    }

    /// Usage counters so far
    pub fn usage(&self) -> OracleUsage {
        OracleUsage {
            calls: self.calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            tokens_spent: self.tokens_spent.load(Ordering::Relaxed),
        }
    }

    /// Provider name for logging
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

/// Compile a word-boundary matcher over a token lexicon
///
/// An empty lexicon compiles to a matcher that never matches.
pub(crate) fn lexicon_matcher(tokens: &[String]) -> Result<Regex, OracleError> {
    if tokens.is_empty() {
        return Regex::new(r"[^\s\S]").map_err(|e| OracleError::Config(e.to_string()));
    }
    let alternation = tokens.iter().map(|t| escape(t)).collect::<Vec<_>>().join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .map_err(|e| OracleError::Config(e.to_string()))
}

/// Merge an oracle verdict into a layer-1 result
///
/// An importance above the long-term threshold upgrades the item and lifts
/// the adjusted score to at least that importance. A discard verdict only
/// downgrades weakly-matched items. Otherwise layer 1 stands.
pub fn merge_verdict(
    raw_score: i64,
    adjusted_score: f64,
    retention: RetentionLevel,
    verdict: &OracleVerdict,
    long_term_threshold: f64,
) -> MergeOutcome {
    if verdict.importance > long_term_threshold {
        let lifted = adjusted_score.max(verdict.importance);
        return MergeOutcome {
            retention: RetentionLevel::LongTerm,
            adjusted_score: lifted,
            delta: lifted - adjusted_score,
            note: format!(
                "oracle upgrade: {} (importance {})",
                verdict.reasoning, verdict.importance
            ),
        };
    }

    if verdict.retention == RetentionLevel::ImmediateDiscard && raw_score < DISCARD_RAW_CEILING {
        return MergeOutcome {
            retention: RetentionLevel::ImmediateDiscard,
            adjusted_score,
            delta: 0.0,
            note: format!("oracle downgrade: {}", verdict.reasoning),
        };
    }

    MergeOutcome {
        retention,
        adjusted_score,
        delta: 0.0,
        note: format!("oracle concurred: {}", verdict.reasoning),
    }
}
