//! Core memory types for the Keepsake system
//!
//! Defines the retention tiers, conversation turns, scoring trace records,
//! and the memory item produced for every classified utterance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How long a derived memory item should be kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionLevel {
    /// Persist for days, weeks, or months
    LongTerm,
    /// Keep for a handful of conversation turns
    ShortTerm,
    /// Forget after this turn
    ImmediateDiscard,
}

impl RetentionLevel {
    /// Ordering used when merging verdicts: higher retains longer
    pub fn rank(self) -> u8 {
        match self {
            RetentionLevel::LongTerm => 2,
            RetentionLevel::ShortTerm => 1,
            RetentionLevel::ImmediateDiscard => 0,
        }
    }
}

/// A single turn of dialogue fed into the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Zero-based position within the conversation
    pub turn_index: u32,
    /// Opaque speaker label
    pub speaker: String,
    /// The spoken text
    pub text: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    /// Create an utterance stamped with the current time
    pub fn new(turn_index: u32, speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            turn_index,
            speaker: speaker.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Reference to this utterance usable from other items
    pub fn reference(&self) -> UtteranceRef {
        UtteranceRef {
            turn_index: self.turn_index,
            speaker: self.speaker.clone(),
        }
    }
}

/// Stable reference to an utterance within a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceRef {
    pub turn_index: u32,
    pub speaker: String,
}

/// Where a scoring contribution came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ScoreSource {
    /// A matched catalog pattern, by name
    Pattern(String),
    /// Severity amplifier token alongside an amplifiable match
    SeverityModifier,
    /// Absolute temporal marker alongside a positive match
    PermanenceModifier,
    /// Immediacy marker alongside a positive match
    UrgencyModifier,
    /// Token-count bonus
    LengthBonus,
    /// First-person statement bonus
    FirstPersonBonus,
    /// Digit-content bonus
    NumericBonus,
    /// Learned per-user adjustment for a pattern, by name
    UserWeight(String),
    /// Bonus applied to the newer side of a contradiction
    ContradictionBonus,
    /// Adjustment applied when merging an oracle verdict
    OracleAdjust,
}

/// One ordered scoring contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub source: ScoreSource,
    pub delta: f64,
}

impl TraceEntry {
    pub fn new(source: ScoreSource, delta: f64) -> Self {
        Self { source, delta }
    }
}

/// Classified memory derived from a single utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// The utterance this item was derived from
    pub utterance: UtteranceRef,
    /// Original text, kept for contradiction comparison and display
    pub text: String,
    /// Sum of matched pattern weights, before any modifier
    pub raw_score: i64,
    /// Score after modifiers, user weights, merges, and decay
    pub adjusted_score: f64,
    /// Assigned retention tier
    pub retention: RetentionLevel,
    /// Ordered record of every scoring contribution
    pub trace: Vec<TraceEntry>,
    /// Category tags of every matched pattern
    pub categories: BTreeSet<String>,
    /// Ids of entities touched while linking this item
    pub entity_refs: BTreeSet<String>,
    /// Set when a later item contradicts this one
    pub superseded_by: Option<UtteranceRef>,
    /// Human-readable explanation of the classification
    pub reasoning: String,
    /// Decay currently subtracted from the adjusted score
    #[serde(default)]
    pub decay_penalty: f64,
    /// True once decay pushed this item below the short-term threshold
    #[serde(default)]
    pub decayed_out: bool,
}

impl MemoryItem {
    /// Matched pattern names in trace order
    pub fn matched_patterns(&self) -> Vec<&str> {
        self.trace
            .iter()
            .filter_map(|entry| match &entry.source {
                ScoreSource::Pattern(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether this item survives past the current turn
    pub fn is_retained(&self) -> bool {
        self.retention != RetentionLevel::ImmediateDiscard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> MemoryItem {
        MemoryItem {
            utterance: UtteranceRef {
                turn_index: 4,
                speaker: "Speaker1".to_string(),
            },
            text: "I have a shellfish allergy".to_string(),
            raw_score: 15,
            adjusted_score: 16.0,
            retention: RetentionLevel::LongTerm,
            trace: vec![
                TraceEntry::new(ScoreSource::Pattern("allergy".to_string()), 15.0),
                TraceEntry::new(ScoreSource::FirstPersonBonus, 1.0),
            ],
            categories: BTreeSet::from(["medical".to_string()]),
            entity_refs: BTreeSet::new(),
            superseded_by: None,
            reasoning: "patterns: allergy(+15); first-person(+1)".to_string(),
            decay_penalty: 0.0,
            decayed_out: false,
        }
    }

    #[test]
    fn test_retention_rank_ordering() {
        assert!(RetentionLevel::LongTerm.rank() > RetentionLevel::ShortTerm.rank());
        assert!(RetentionLevel::ShortTerm.rank() > RetentionLevel::ImmediateDiscard.rank());
    }

    #[test]
    fn test_retention_serialization() {
        let levels = vec![
            RetentionLevel::LongTerm,
            RetentionLevel::ShortTerm,
            RetentionLevel::ImmediateDiscard,
        ];

        for level in levels {
            let json = serde_json::to_string(&level).expect("Failed to serialize");
            let deserialized: RetentionLevel =
                serde_json::from_str(&json).expect("Failed to deserialize");
            assert_eq!(level, deserialized);
        }

        assert_eq!(
            serde_json::to_string(&RetentionLevel::LongTerm).unwrap(),
            "\"long_term\""
        );
    }

    #[test]
    fn test_memory_item_round_trip() {
        let item = sample_item();
        let json = serde_json::to_string(&item).expect("Failed to serialize item");
        let back: MemoryItem = serde_json::from_str(&json).expect("Failed to deserialize item");

        assert_eq!(back.utterance, item.utterance);
        assert_eq!(back.raw_score, item.raw_score);
        assert_eq!(back.adjusted_score, item.adjusted_score);
        assert_eq!(back.retention, item.retention);
        assert_eq!(back.trace, item.trace);
        assert_eq!(back.categories, item.categories);
        assert_eq!(back.reasoning, item.reasoning);
    }

    #[test]
    fn test_matched_patterns_preserves_order() {
        let mut item = sample_item();
        item.trace.push(TraceEntry::new(
            ScoreSource::Pattern("dietary".to_string()),
            13.0,
        ));
        assert_eq!(item.matched_patterns(), vec!["allergy", "dietary"]);
    }

    #[test]
    fn test_is_retained() {
        let mut item = sample_item();
        assert!(item.is_retained());
        item.retention = RetentionLevel::ImmediateDiscard;
        assert!(!item.is_retained());
    }

    #[test]
    fn test_utterance_reference() {
        let utterance = Utterance::new(7, "Speaker2", "hello");
        let reference = utterance.reference();
        assert_eq!(reference.turn_index, 7);
        assert_eq!(reference.speaker, "Speaker2");
    }
}
