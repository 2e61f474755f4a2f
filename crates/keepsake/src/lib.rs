//! Keepsake - retention-tier classification for multi-turn dialogue
//!
//! This crate decides what a conversational agent should remember. Each
//! utterance flows through a pattern-based scorer, an optional semantic
//! oracle fallback, contradiction and decay passes, and a cross-turn
//! entity linker, producing memory items tagged long-term, short-term,
//! or immediate-discard together with a full scoring trace.

pub mod config;
pub mod entity;
pub mod error;
pub mod learning;
pub mod memory;
pub mod oracle;
pub mod pattern;
pub mod pipeline;
pub mod scoring;
pub mod storage;
pub mod testing;

pub use error::KeepsakeError;
