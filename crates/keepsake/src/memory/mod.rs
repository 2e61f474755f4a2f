//! Memory data model and per-conversation maintenance passes

pub mod contradiction;
pub mod decay;
pub mod ingestion;
pub mod types;

pub use contradiction::ContradictionDetector;
pub use decay::DecayEngine;
pub use types::{MemoryItem, RetentionLevel, ScoreSource, TraceEntry, Utterance, UtteranceRef};
