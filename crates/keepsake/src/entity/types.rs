//! Entity types for cross-turn identity tracking
//!
//! An entity accumulates every surface form, attribute, and mention
//! observed for one real-world referent across a conversation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Closed set of entity kinds the linker recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Location,
    MedicalCondition,
    Organization,
    Event,
    Other,
}

impl EntityType {
    /// Stable key used in entity ids
    pub fn key(self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Location => "location",
            EntityType::MedicalCondition => "medical_condition",
            EntityType::Organization => "organization",
            EntityType::Event => "event",
            EntityType::Other => "other",
        }
    }
}

/// One observed value for an attribute, with turn provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeObservation {
    pub value: String,
    pub turn_index: u32,
}

/// One recorded mention of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub turn_index: u32,
    pub surface: String,
}

/// Cross-turn identity accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Deterministic id, stable within a conversation (and across
    /// conversations when the linker is namespaced by user)
    pub entity_id: String,
    pub entity_type: EntityType,
    /// Most descriptive surface form observed
    pub canonical_name: String,
    /// Every other surface form, lowercased, pronouns included
    pub aliases: BTreeSet<String>,
    /// Attribute observations, appended rather than overwritten so
    /// conflicting values keep their provenance
    pub attributes: BTreeMap<String, Vec<AttributeObservation>>,
    pub mentions: Vec<Mention>,
    pub first_turn: u32,
    pub last_turn: u32,
    /// Highest adjusted score of any memory item touching this entity
    pub importance_score: f64,
}

impl Entity {
    pub fn new(
        entity_id: impl Into<String>,
        entity_type: EntityType,
        canonical_name: impl Into<String>,
        turn_index: u32,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
            canonical_name: canonical_name.into(),
            aliases: BTreeSet::new(),
            attributes: BTreeMap::new(),
            mentions: Vec::new(),
            first_turn: turn_index,
            last_turn: turn_index,
            importance_score: 0.0,
        }
    }

    /// Number of recorded mentions
    pub fn mention_count(&self) -> usize {
        self.mentions.len()
    }

    /// Record a mention and advance the turn range
    pub fn add_mention(&mut self, turn_index: u32, surface: impl Into<String>) {
        self.mentions.push(Mention {
            turn_index,
            surface: surface.into(),
        });
        if turn_index < self.first_turn {
            self.first_turn = turn_index;
        }
        if turn_index > self.last_turn {
            self.last_turn = turn_index;
        }
    }

    /// Union a lowercased surface form into the alias set
    ///
    /// The canonical name itself is not an alias.
    pub fn add_alias(&mut self, surface: &str) {
        let lowered = surface.to_lowercase();
        if lowered != self.canonical_name.to_lowercase() {
            self.aliases.insert(lowered);
        }
    }

    /// Append an attribute observation
    ///
    /// Returns the previous value when the new observation differs from
    /// it; repeated identical values are not re-recorded.
    pub fn observe_attribute(
        &mut self,
        key: &str,
        value: impl Into<String>,
        turn_index: u32,
    ) -> Option<String> {
        let value = value.into();
        let observations = self.attributes.entry(key.to_string()).or_default();

        let conflict = observations
            .last()
            .filter(|last| last.value != value)
            .map(|last| last.value.clone());

        if observations.last().map(|last| last.value.as_str()) != Some(value.as_str()) {
            observations.push(AttributeObservation { value, turn_index });
        }
        conflict
    }

    /// Latest observed value for an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|obs| obs.last())
            .map(|obs| obs.value.as_str())
    }

    /// Raise the importance score to at least `score`
    pub fn bump_importance(&mut self, score: f64) {
        if score > self.importance_score {
            self.importance_score = score;
        }
    }
}
