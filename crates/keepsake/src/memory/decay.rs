//! Temporal decay for short-term items
//!
//! Pure function over accumulated items and the current turn. Short-term
//! items lose score once they age past the grace window; dropping below
//! the short-term threshold reclassifies them for eviction. The penalty
//! is recomputed from scratch each pass, so applying the same turn twice
//! changes nothing.

use tracing::debug;

use crate::config::{DecayConfig, ScoringConfig};
use crate::memory::types::{MemoryItem, RetentionLevel};

/// Applies turn-based decay to short-term items
pub struct DecayEngine {
    window_turns: u32,
    rate: f64,
    short_term_threshold: f64,
}

impl DecayEngine {
    pub fn new(decay: &DecayConfig, scoring: &ScoringConfig) -> Self {
        Self {
            window_turns: decay.window_turns,
            rate: decay.rate,
            short_term_threshold: scoring.short_term_threshold,
        }
    }

    /// Decay all eligible items as of `current_turn`
    ///
    /// Long-term items are untouched. Items a previous pass already
    /// decayed out keep decaying, so their recorded score stays an honest
    /// function of age. Returns how many items were newly marked for
    /// eviction.
    pub fn apply(&self, items: &mut [MemoryItem], current_turn: u32) -> usize {
        let mut evicted = 0;

        for item in items.iter_mut() {
            let eligible = item.retention == RetentionLevel::ShortTerm || item.decayed_out;
            if !eligible {
                continue;
            }

            let turns_ago = current_turn.saturating_sub(item.utterance.turn_index);
            let penalty = if turns_ago > self.window_turns {
                self.rate * f64::from(turns_ago - self.window_turns)
            } else {
                0.0
            };

            if penalty == item.decay_penalty {
                continue;
            }

            item.adjusted_score = item.adjusted_score + item.decay_penalty - penalty;
            item.decay_penalty = penalty;

            if item.retention == RetentionLevel::ShortTerm
                && item.adjusted_score < self.short_term_threshold
            {
                debug!(
                    "Turn-{} item decayed to {:.1}, marking for eviction",
                    item.utterance.turn_index, item.adjusted_score
                );
                item.retention = RetentionLevel::ImmediateDiscard;
                item.decayed_out = true;
                item.reasoning.push_str(" | decayed below retention threshold");
                evicted += 1;
            }
        }

        evicted
    }
}
