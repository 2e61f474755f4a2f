//! Additive pattern scoring
//!
//! Layer 1 of the pipeline. Sums matched pattern weights, applies the
//! modifier rules in a fixed order, folds in learned per-user weights,
//! and decides a retention tier. Every contribution is recorded in an
//! ordered trace so the adjusted score can be reconstructed exactly.

use regex::{escape, Regex, RegexBuilder};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::error::{KeepsakeError, Result};
use crate::memory::types::{RetentionLevel, ScoreSource, TraceEntry, Utterance};
use crate::pattern::PatternRegistry;

/// Modifier tag consulted by the severity rule
pub const SEVERITY_TAG: &str = "severity_amplifiable";

/// Pattern weight at or above which a very short utterance still counts
const SHORT_UTTERANCE_EXEMPT_WEIGHT: i32 = 12;

/// Token count below which an unmatched utterance is treated as noise
const SHORT_UTTERANCE_TOKENS: usize = 3;

/// A catalog pattern that matched, with the metadata later layers need
#[derive(Debug, Clone)]
pub struct MatchedPattern {
    pub name: String,
    pub weight: i32,
    pub category: String,
    pub severity_amplifiable: bool,
}

/// Full result of scoring one utterance
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub raw_score: i64,
    pub adjusted_score: f64,
    pub retention: RetentionLevel,
    /// True when the score falls in the band the oracle should review
    pub borderline: bool,
    pub trace: Vec<TraceEntry>,
    pub categories: BTreeSet<String>,
    pub matched: Vec<MatchedPattern>,
}

impl ScoreBreakdown {
    /// Human-readable summary of the contributions, used for reasoning
    pub fn summary(&self) -> String {
        if self.trace.is_empty() {
            return "no significant signals".to_string();
        }

        let parts: Vec<String> = self
            .trace
            .iter()
            .map(|entry| {
                let label = match &entry.source {
                    ScoreSource::Pattern(name) => name.clone(),
                    ScoreSource::SeverityModifier => "severity".to_string(),
                    ScoreSource::PermanenceModifier => "permanence".to_string(),
                    ScoreSource::UrgencyModifier => "urgency".to_string(),
                    ScoreSource::LengthBonus => "length".to_string(),
                    ScoreSource::FirstPersonBonus => "first-person".to_string(),
                    ScoreSource::NumericBonus => "numeric".to_string(),
                    ScoreSource::UserWeight(name) => format!("user:{name}"),
                    ScoreSource::ContradictionBonus => "contradiction".to_string(),
                    ScoreSource::OracleAdjust => "oracle".to_string(),
                };
                format!("{label}({:+})", entry.delta)
            })
            .collect();
        parts.join(", ")
    }
}

/// Layer-1 scorer over a shared pattern registry
pub struct PatternScorer {
    registry: Arc<PatternRegistry>,
    config: ScoringConfig,
    severity_matchers: Vec<(String, Regex)>,
    permanence_matcher: Regex,
    urgency_matcher: Regex,
    first_person_matcher: Regex,
    digit_matcher: Regex,
}

fn token_list_regex(tokens: &[String]) -> Result<Regex> {
    let alternation = tokens
        .iter()
        .map(|t| escape(t))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .map_err(|e| KeepsakeError::Config(format!("bad modifier token list: {e}")))
}

impl PatternScorer {
    /// Build a scorer, compiling the modifier vocabularies once
    pub fn new(registry: Arc<PatternRegistry>, config: ScoringConfig) -> Result<Self> {
        let severity_matchers = config
            .severity_triggers
            .iter()
            .map(|t| token_list_regex(std::slice::from_ref(t)).map(|re| (t.clone(), re)))
            .collect::<Result<Vec<_>>>()?;
        let permanence_matcher = token_list_regex(&config.permanence_markers)?;
        let urgency_matcher = token_list_regex(&config.urgency_markers)?;
        let first_person_matcher = RegexBuilder::new(r"\b(i|i'm|i've|my|me|mine)\b")
            .case_insensitive(true)
            .build()
            .map_err(|e| KeepsakeError::Config(e.to_string()))?;
        let digit_matcher =
            Regex::new(r"\d").map_err(|e| KeepsakeError::Config(e.to_string()))?;

        Ok(Self {
            registry,
            config,
            severity_matchers,
            permanence_matcher,
            urgency_matcher,
            first_person_matcher,
            digit_matcher,
        })
    }

    /// The registry this scorer matches against
    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    /// Matched patterns for a statement, without any scoring side effects
    pub fn matches_for(&self, text: &str) -> Vec<MatchedPattern> {
        self.registry
            .match_all(text)
            .into_iter()
            .map(|m| MatchedPattern {
                name: m.pattern.name.clone(),
                weight: m.pattern.weight,
                category: m.pattern.category.clone(),
                severity_amplifiable: m.pattern.has_tag(SEVERITY_TAG),
            })
            .collect()
    }

    /// Score an utterance with a user's learned weight adjustments
    pub fn score(
        &self,
        utterance: &Utterance,
        user_weights: &HashMap<String, f64>,
    ) -> ScoreBreakdown {
        let text = utterance.text.as_str();
        let matched = self.matches_for(text);

        let mut trace = Vec::new();
        let mut categories = BTreeSet::new();
        let mut raw_score: i64 = 0;

        for m in &matched {
            raw_score += i64::from(m.weight);
            categories.insert(m.category.clone());
            trace.push(TraceEntry::new(
                ScoreSource::Pattern(m.name.clone()),
                f64::from(m.weight),
            ));
        }

        let token_count = text.split_whitespace().count();

        // Very short turns with no substantive match are noise
        if token_count < SHORT_UTTERANCE_TOKENS
            && !matched.iter().any(|m| m.weight >= SHORT_UTTERANCE_EXEMPT_WEIGHT)
        {
            return ScoreBreakdown {
                raw_score,
                adjusted_score: raw_score as f64,
                retention: RetentionLevel::ImmediateDiscard,
                borderline: false,
                trace,
                categories,
                matched,
            };
        }

        let mut adjusted = raw_score as f64;
        let has_positive = matched.iter().any(|m| m.weight > 0);
        let has_amplifiable = matched.iter().any(|m| m.severity_amplifiable);

        // 1. Severity: +5 per distinct trigger token present
        if has_amplifiable {
            for (_, matcher) in &self.severity_matchers {
                if matcher.is_match(text) {
                    adjusted += 5.0;
                    trace.push(TraceEntry::new(ScoreSource::SeverityModifier, 5.0));
                }
            }
        }

        // 2. Permanence: +3 once
        if has_positive && self.permanence_matcher.is_match(text) {
            adjusted += 3.0;
            trace.push(TraceEntry::new(ScoreSource::PermanenceModifier, 3.0));
        }

        // 3. Urgency: +4 once
        if has_positive && self.urgency_matcher.is_match(text) {
            adjusted += 4.0;
            trace.push(TraceEntry::new(ScoreSource::UrgencyModifier, 4.0));
        }

        // 4. Length bonus, independent of matches
        let length_bonus = if token_count >= 24 {
            2.0
        } else if token_count >= 12 {
            1.0
        } else {
            0.0
        };
        if length_bonus > 0.0 {
            adjusted += length_bonus;
            trace.push(TraceEntry::new(ScoreSource::LengthBonus, length_bonus));
        }

        // 5. First-person bonus
        if has_positive && self.first_person_matcher.is_match(text) {
            adjusted += 1.0;
            trace.push(TraceEntry::new(ScoreSource::FirstPersonBonus, 1.0));
        }

        // 6. Numeric/date content
        if has_positive && self.digit_matcher.is_match(text) {
            adjusted += 1.0;
            trace.push(TraceEntry::new(ScoreSource::NumericBonus, 1.0));
        }

        // 7. Learned per-user adjustments, then round to the nearest 0.1
        for m in &matched {
            if let Some(&delta) = user_weights.get(&m.name) {
                if delta != 0.0 {
                    adjusted += delta;
                    trace.push(TraceEntry::new(ScoreSource::UserWeight(m.name.clone()), delta));
                }
            }
        }
        adjusted = round_tenth(adjusted);

        let (retention, borderline) = self.decide(adjusted);

        ScoreBreakdown {
            raw_score,
            adjusted_score: adjusted,
            retention,
            borderline,
            trace,
            categories,
            matched,
        }
    }

    /// Map an adjusted score to a retention tier, flagging the borderline band
    pub fn decide(&self, adjusted: f64) -> (RetentionLevel, bool) {
        let c = &self.config;
        if adjusted >= c.long_term_threshold {
            (RetentionLevel::LongTerm, false)
        } else if adjusted >= c.borderline_low && adjusted <= c.borderline_high {
            (RetentionLevel::ShortTerm, true)
        } else if adjusted >= c.short_term_threshold {
            (RetentionLevel::ShortTerm, false)
        } else {
            (RetentionLevel::ImmediateDiscard, false)
        }
    }

    /// Scoring thresholds in effect
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }
}

/// Round to the nearest tenth
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> PatternScorer {
        let registry = Arc::new(PatternRegistry::builtin().unwrap());
        PatternScorer::new(registry, ScoringConfig::default()).unwrap()
    }

    fn score_text(text: &str) -> ScoreBreakdown {
        scorer().score(&Utterance::new(0, "Speaker1", text), &HashMap::new())
    }

    #[test]
    fn test_greeting_discarded() {
        let breakdown = score_text("Hello, how are you today?");
        assert_eq!(breakdown.retention, RetentionLevel::ImmediateDiscard);
        assert!(breakdown.adjusted_score <= 2.0);
        assert!(breakdown
            .matched
            .iter()
            .any(|m| m.name == "greeting" && m.weight < 0));
    }

    #[test]
    fn test_severity_fires_per_distinct_trigger() {
        let breakdown = score_text(
            "I have a severe peanut allergy and my EpiPen expired - it's life-threatening if we don't have one.",
        );
        let severity_total: f64 = breakdown
            .trace
            .iter()
            .filter(|e| e.source == ScoreSource::SeverityModifier)
            .map(|e| e.delta)
            .sum();
        assert_eq!(severity_total, 10.0, "severe + life-threatening should both fire");
        assert_eq!(breakdown.retention, RetentionLevel::LongTerm);
        assert!(breakdown.adjusted_score >= 25.0);
    }

    #[test]
    fn test_severity_requires_amplifiable_match() {
        // "severe" present but no severity-taggable pattern matched
        let breakdown = score_text("That movie had severe pacing problems but I enjoy it");
        assert!(!breakdown
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::SeverityModifier));
    }

    #[test]
    fn test_permanence_requires_positive_match() {
        let with_match = score_text("I always love my morning routine");
        assert!(with_match
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::PermanenceModifier));

        let without_match = score_text("always raining around here lately");
        assert!(!without_match
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::PermanenceModifier));
    }

    #[test]
    fn test_urgency_modifier() {
        let breakdown = score_text("I need to pick up my medication right now");
        let urgency: Vec<_> = breakdown
            .trace
            .iter()
            .filter(|e| e.source == ScoreSource::UrgencyModifier)
            .collect();
        assert_eq!(urgency.len(), 1);
        assert_eq!(urgency[0].delta, 4.0);
    }

    #[test]
    fn test_length_bonus_tiers() {
        let twelve = "one two three four five six seven eight nine ten eleven twelve";
        let breakdown = score_text(twelve);
        assert!(breakdown
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::LengthBonus && e.delta == 1.0));

        let long = format!("{twelve} {twelve}");
        let breakdown = score_text(&long);
        assert!(breakdown
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::LengthBonus && e.delta == 2.0));
    }

    #[test]
    fn test_numeric_bonus_requires_positive_match() {
        let with_match = score_text("My daughter is 5 years old");
        assert!(with_match
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::NumericBonus));

        let without_match = score_text("ticket 12345 uh whatever");
        assert!(!without_match
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::NumericBonus));
    }

    #[test]
    fn test_user_weight_applied_and_rounded() {
        let s = scorer();
        let mut weights = HashMap::new();
        weights.insert("strong_preference".to_string(), 2.5);

        let breakdown = s.score(&Utterance::new(0, "Speaker1", "I love sushi."), &weights);
        // 12 (love) + 1 (first person) + 2.5
        assert_eq!(breakdown.adjusted_score, 15.5);
        assert_eq!(breakdown.retention, RetentionLevel::LongTerm);
        assert!(breakdown
            .trace
            .iter()
            .any(|e| e.source == ScoreSource::UserWeight("strong_preference".to_string())));
    }

    #[test]
    fn test_borderline_band() {
        let breakdown = score_text("Flying absolutely terrifies me.");
        assert!(breakdown.borderline, "score {} should be borderline", breakdown.adjusted_score);
        assert!(breakdown.adjusted_score >= 10.0 && breakdown.adjusted_score <= 14.0);
        assert_eq!(breakdown.retention, RetentionLevel::ShortTerm);
    }

    #[test]
    fn test_threshold_boundaries_inclusive() {
        let s = scorer();
        assert_eq!(s.decide(15.0), (RetentionLevel::LongTerm, false));
        assert_eq!(s.decide(10.0), (RetentionLevel::ShortTerm, true));
        assert_eq!(s.decide(3.0), (RetentionLevel::ShortTerm, false));
        assert_eq!(s.decide(2.9), (RetentionLevel::ImmediateDiscard, false));
    }

    #[test]
    fn test_punctuation_only_has_empty_trace() {
        let breakdown = score_text("?!...");
        assert_eq!(breakdown.retention, RetentionLevel::ImmediateDiscard);
        assert!(breakdown.trace.is_empty());
        assert!(breakdown.matched.is_empty());
    }

    #[test]
    fn test_short_turn_noise_fast_path() {
        let breakdown = score_text("sounds good");
        assert_eq!(breakdown.retention, RetentionLevel::ImmediateDiscard);
    }

    #[test]
    fn test_short_turn_with_critical_keyword_kept() {
        let breakdown = score_text("Shellfish allergy.");
        assert_ne!(breakdown.retention, RetentionLevel::ImmediateDiscard);
    }

    #[test]
    fn test_trace_reconstructs_adjusted_score() {
        let breakdown = score_text(
            "I have a severe peanut allergy and my EpiPen expired - it's life-threatening if we don't have one.",
        );
        let total: f64 = breakdown.trace.iter().map(|e| e.delta).sum();
        assert!((round_tenth(total) - breakdown.adjusted_score).abs() < 1e-9);
    }

    #[test]
    fn test_many_matches_trace_length() {
        // One entry per distinct matched pattern plus modifier entries
        let breakdown = score_text(
            "I love my daughter, I hate flying, my allergy medication and therapy appointment, \
             married, divorced, fired, pregnant, diagnosed anxiety, epipen, vegan, kindergarten wedding",
        );
        let pattern_entries = breakdown
            .trace
            .iter()
            .filter(|e| matches!(e.source, ScoreSource::Pattern(_)))
            .count();
        assert_eq!(pattern_entries, breakdown.matched.len());
        assert!(breakdown.matched.len() >= 10);
    }
}
