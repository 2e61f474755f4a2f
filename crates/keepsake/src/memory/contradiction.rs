//! Contradiction detection across retained items
//!
//! A new retained item is compared against every earlier retained item.
//! When both cover the same ground and one negates the other, the newer
//! statement wins: it gains a score bonus and the older item is marked
//! superseded. Nothing is deleted.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use tracing::debug;

use crate::memory::types::{MemoryItem, ScoreSource, TraceEntry};

/// Bonus granted to the newer side of a contradiction
pub const CONTRADICTION_BONUS: f64 = 5.0;

/// Category pairs treated as covering the same ground
const RELATED_CATEGORIES: &[(&str, &str)] = &[
    ("preference", "dietary_restriction"),
    ("preference", "dietary"),
    ("dietary", "dietary_restriction"),
    ("dietary", "life_change"),
    ("preference", "life_change"),
    ("career", "life_change"),
    ("career", "past_status"),
    ("career", "major_life_event"),
    ("relationship_status", "past_status"),
    ("relationship_status", "life_change"),
    ("occasional_behavior", "preference"),
];

const STOPWORDS: &[&str] = &[
    "that", "this", "with", "have", "from", "they", "them", "were", "been",
    "will", "would", "about", "there", "their", "what", "when", "your",
    "really", "just", "anymore", "because",
];

/// Detects and marks contradictions between memory items
pub struct ContradictionDetector {
    negation: Regex,
    hypothetical: Regex,
}

impl Default for ContradictionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ContradictionDetector {
    pub fn new() -> Self {
        // Both vocabularies are fixed; the patterns are known-good
        let negation = RegexBuilder::new(
            r"\b(?:not|never|can't|cannot|won't|don't|doesn't|didn't|no longer|not anymore|stopped|quit|gave up)\b",
        )
        .case_insensitive(true)
        .build()
        .expect("negation pattern");
        let hypothetical = RegexBuilder::new(
            r"\b(?:would|could|might|if|thinking about|planning to|considering)\b",
        )
        .case_insensitive(true)
        .build()
        .expect("hypothetical pattern");

        Self {
            negation,
            hypothetical,
        }
    }

    /// Review the newest item against all earlier ones
    ///
    /// Earlier contradicted items get `superseded_by` set to the newest
    /// item's utterance; the newest gains the contradiction bonus once.
    /// Returns the number of earlier items superseded.
    pub fn review(&self, items: &mut [MemoryItem], newest: usize) -> usize {
        let (earlier, rest) = items.split_at_mut(newest);
        let newest_item = &mut rest[0];
        if !newest_item.is_retained() {
            return 0;
        }

        let mut superseded = 0;
        for item in earlier.iter_mut() {
            if !item.is_retained() || item.superseded_by.is_some() {
                continue;
            }
            if item.utterance.turn_index == newest_item.utterance.turn_index {
                continue;
            }
            if !self.contradicts(item, newest_item) {
                continue;
            }

            debug!(
                "Turn {} supersedes turn {}",
                newest_item.utterance.turn_index, item.utterance.turn_index
            );
            item.superseded_by = Some(newest_item.utterance.clone());
            item.reasoning
                .push_str(&format!(" | superseded by turn {}", newest_item.utterance.turn_index));
            superseded += 1;
        }

        if superseded > 0 {
            newest_item.adjusted_score += CONTRADICTION_BONUS;
            newest_item
                .trace
                .push(TraceEntry::new(ScoreSource::ContradictionBonus, CONTRADICTION_BONUS));
            newest_item.reasoning.push_str(&format!(
                " | contradicts {superseded} earlier statement(s) (+{CONTRADICTION_BONUS})"
            ));
        }
        superseded
    }

    fn contradicts(&self, earlier: &MemoryItem, newer: &MemoryItem) -> bool {
        if !self.categories_related(earlier, newer) {
            return false;
        }

        // Hypotheticals are not commitments, so they contradict nothing
        if self.hypothetical.is_match(&earlier.text) || self.hypothetical.is_match(&newer.text) {
            return false;
        }

        let earlier_negated = self.negation.is_match(&earlier.text);
        let newer_negated = self.negation.is_match(&newer.text);
        if earlier_negated == newer_negated {
            return false;
        }

        let earlier_tokens = salient_tokens(&earlier.text);
        let newer_tokens = salient_tokens(&newer.text);
        earlier_tokens.intersection(&newer_tokens).next().is_some()
    }

    fn categories_related(&self, a: &MemoryItem, b: &MemoryItem) -> bool {
        if a.categories.intersection(&b.categories).next().is_some() {
            return true;
        }
        RELATED_CATEGORIES.iter().any(|(x, y)| {
            (a.categories.contains(*x) && b.categories.contains(*y))
                || (a.categories.contains(*y) && b.categories.contains(*x))
        })
    }
}

/// Content words worth comparing across statements
fn salient_tokens(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.len() >= 4 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}
