//! Cross-turn entity extraction and linking

pub mod linker;
pub mod types;

pub use linker::{EntityLinker, LinkOutcome};
pub use types::{AttributeObservation, Entity, EntityType, Mention};
