//! Cross-turn entity linker
//!
//! Extracts candidate mentions from an utterance with pattern-based
//! recognizers, resolves each against the entities accumulated so far,
//! binds pronouns to recent referents, and accrues attributes such as
//! ages and relationships onto the linked entities.

use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::config::EntityConfig;
use crate::error::{KeepsakeError, Result};
use crate::memory::types::Utterance;

use super::types::{Entity, EntityType};

/// Conflicting attribute observation surfaced by a link pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeConflict {
    pub entity_id: String,
    pub attribute: String,
    pub previous: String,
    pub current: String,
}

/// Result of linking a single utterance
#[derive(Debug, Clone, Default)]
pub struct LinkOutcome {
    /// Ids of every entity created or updated
    pub touched: BTreeSet<String>,
    /// Mention records added across all touched entities
    pub mentions_added: usize,
    /// Numeric or categorical attribute values that contradicted an
    /// earlier observation (both are kept, with provenance)
    pub conflicts: Vec<AttributeConflict>,
}

enum Canonical {
    Fixed(&'static str),
    MatchedText,
}

/// Words never treated as location or organization names
const NAME_EXCLUSIONS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august",
    "september", "october", "november", "december", "monday", "tuesday",
    "wednesday", "thursday", "friday", "saturday", "sunday", "i", "ok", "okay",
    "god", "hello", "thanks",
];

const ORG_SUFFIXES: &[&str] = &[
    "Inc", "Corp", "LLC", "University", "College", "Hospital", "School",
    "Elementary", "Academy", "Company",
];

/// Pattern-based entity extractor and resolver
pub struct EntityLinker {
    entities: HashMap<String, Entity>,
    /// Link-pass sequence at which each entity was last seen
    last_seen_seq: HashMap<String, u32>,
    seq: u32,
    pronoun_window: u32,
    namespace: Option<String>,

    kinship: Regex,
    titled: Regex,
    medical: Vec<(Regex, Canonical)>,
    organization: Regex,
    location: Regex,
    event: Regex,
    pronoun: Regex,
    capitalized: Regex,
    age_patterns: Vec<Regex>,
    grade: Regex,
    possession: Regex,
}

impl EntityLinker {
    /// Build a linker scoped to one conversation
    pub fn new(config: &EntityConfig) -> Result<Self> {
        Self::with_namespace(config, None)
    }

    /// Build a linker whose entity ids are namespaced by user
    ///
    /// Namespaced ids are stable across that user's conversations.
    pub fn with_namespace(config: &EntityConfig, user_id: Option<&str>) -> Result<Self> {
        let case_sensitive = |raw: &str| {
            Regex::new(raw).map_err(|e| KeepsakeError::Config(format!("entity recognizer: {e}")))
        };
        let case_insensitive = |raw: &str| {
            RegexBuilder::new(raw)
                .case_insensitive(true)
                .build()
                .map_err(|e| KeepsakeError::Config(format!("entity recognizer: {e}")))
        };

        let medical = vec![
            (
                case_insensitive(r"\b(?:severe\s+)?peanut\s+allerg(?:y|ies|ic)\b")?,
                Canonical::Fixed("peanut allergy"),
            ),
            (
                case_insensitive(r"\b(?:severe\s+)?shellfish\s+allerg(?:y|ies|ic)\b")?,
                Canonical::Fixed("shellfish allergy"),
            ),
            (
                case_insensitive(r"\b(?:severe\s+)?(?:tree\s+)?nut\s+allerg(?:y|ies|ic)\b")?,
                Canonical::Fixed("nut allergy"),
            ),
            (
                case_insensitive(r"\ballerg(?:y|ies|ic)\b")?,
                Canonical::Fixed("allergy"),
            ),
            (
                case_insensitive(r"\blactose\s+intoleran(?:t|ce)\b")?,
                Canonical::Fixed("lactose intolerance"),
            ),
            (
                case_insensitive(r"\bgluten\s+intoleran(?:t|ce)\b")?,
                Canonical::Fixed("gluten intolerance"),
            ),
            (
                case_insensitive(r"\b(ptsd|anxiety|depression|panic attacks?)\b")?,
                Canonical::MatchedText,
            ),
            (
                case_insensitive(r"\b(diabetes|asthma|epilepsy|cancer)\b")?,
                Canonical::MatchedText,
            ),
        ];

        Ok(Self {
            entities: HashMap::new(),
            last_seen_seq: HashMap::new(),
            seq: 0,
            pronoun_window: config.pronoun_window,
            namespace: user_id.map(str::to_string),
            kinship: case_sensitive(
                r"\b[Mm]y (wife|husband|partner|spouse|son|daughter|child|kid|mother|mom|father|dad|brother|sister|friend|colleague|boss)(?: (?:named |called )?([A-Z][a-z]+))?",
            )?,
            titled: case_sensitive(r"\b(?:Mr|Mrs|Ms|Dr|Prof)\.? ([A-Z][a-z]+)\b")?,
            medical,
            organization: case_sensitive(
                r"\b([A-Z][a-z]+(?: [A-Z][a-z]+)* (?:Inc|Corp|LLC|University|College|Hospital|School|Elementary|Academy|Company))\b",
            )?,
            location: case_sensitive(r"\b(?:in|at|to|from) ([A-Z][a-z]+(?: [A-Z][a-z]+)?)\b")?,
            event: case_sensitive(
                r"\b([A-Z][a-z]+(?:'s)? (?:birthday party|wedding|graduation|funeral|recital))\b",
            )?,
            pronoun: case_insensitive(r"\b(he|she|they|it|him|her|them)\b")?,
            capitalized: case_sensitive(r"\b([A-Z][a-z]{2,})\b")?,
            age_patterns: vec![
                case_insensitive(r"(\d+) years? old")?,
                case_insensitive(r"\bage (\d+)")?,
                case_insensitive(r"\bturned (\d+)")?,
            ],
            grade: case_insensitive(r"(\d+)(?:st|nd|rd|th) grade")?,
            possession: case_insensitive(r"\b(has|have|suffers from)\b")?,
        })
    }

    /// Link one utterance into the entity graph
    pub fn link(&mut self, utterance: &Utterance) -> LinkOutcome {
        self.seq += 1;
        let turn = utterance.turn_index;
        let text = utterance.text.as_str();

        let mut outcome = LinkOutcome::default();
        let mut persons_touched: Vec<String> = Vec::new();

        // People via kinship terms, optionally carrying a given name
        let kinship_caps: Vec<(String, Option<String>, String)> = self
            .kinship
            .captures_iter(text)
            .map(|caps| {
                (
                    caps[1].to_lowercase(),
                    caps.get(2).map(|m| m.as_str().to_string()),
                    caps[0].to_string(),
                )
            })
            .collect();
        for (relation, name, surface) in kinship_caps {
            let relation_phrase = format!("my {relation}");
            let mut lookups: Vec<&str> = Vec::new();
            if let Some(n) = name.as_deref() {
                lookups.push(n);
            }
            lookups.push(&relation_phrase);

            let display = name.clone().unwrap_or_else(|| relation_phrase.clone());
            let id = self.resolve_or_create(EntityType::Person, &lookups, &display, turn);
            self.touch(&id, turn, &surface, &mut outcome);
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.add_alias(&relation_phrase);
                if let Some(conflict) = entity.observe_attribute("relationship", &relation, turn) {
                    outcome.conflicts.push(AttributeConflict {
                        entity_id: id.clone(),
                        attribute: "relationship".to_string(),
                        previous: conflict,
                        current: relation.clone(),
                    });
                }
            }
            persons_touched.push(id);
        }

        // People via titles (Dr. Chen)
        let titled_caps: Vec<(String, String)> = self
            .titled
            .captures_iter(text)
            .map(|caps| (caps[1].to_string(), caps[0].to_string()))
            .collect();
        for (name, surface) in titled_caps {
            let id = self.resolve_or_create(EntityType::Person, &[name.as_str()], &name, turn);
            self.touch(&id, turn, &surface, &mut outcome);
            persons_touched.push(id);
        }

        // Re-mentions of already-known people by bare name
        let bare_names: Vec<String> = self
            .capitalized
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();
        for name in bare_names {
            let lowered = name.to_lowercase();
            if NAME_EXCLUSIONS.contains(&lowered.as_str())
                || pronoun_compatible(&lowered, EntityType::Person)
                || pronoun_compatible(&lowered, EntityType::Other)
            {
                continue;
            }
            if let Some(id) = self.resolve(EntityType::Person, &[name.as_str()]) {
                if !outcome.touched.contains(&id) {
                    self.touch(&id, turn, &name, &mut outcome);
                    persons_touched.push(id);
                }
            }
        }

        // Medical conditions, canonicalized; the general allergy entry is
        // skipped once a specific allergy matched
        let mut conditions_touched: Vec<String> = Vec::new();
        let mut saw_specific_allergy = false;
        let mut medical_hits: Vec<(String, String)> = Vec::new();
        for (matcher, canonical) in &self.medical {
            if let Some(m) = matcher.find(text) {
                let canonical_name = match canonical {
                    Canonical::Fixed(fixed) => {
                        if *fixed == "allergy" && saw_specific_allergy {
                            continue;
                        }
                        if fixed.ends_with("allergy") && *fixed != "allergy" {
                            saw_specific_allergy = true;
                        }
                        fixed.to_string()
                    }
                    Canonical::MatchedText => m.as_str().to_lowercase(),
                };
                medical_hits.push((canonical_name, m.as_str().to_string()));
            }
        }
        for (canonical_name, surface) in medical_hits {
            let id =
                self.resolve_or_create(EntityType::MedicalCondition, &[canonical_name.as_str()], &canonical_name, turn);
            self.touch(&id, turn, &surface, &mut outcome);
            conditions_touched.push(id);
        }

        // Organizations (capitalized multiword with an institutional suffix)
        let org_caps: Vec<String> = self
            .organization
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();
        for name in org_caps {
            let id = self.resolve_or_create(EntityType::Organization, &[name.as_str()], &name, turn);
            self.touch(&id, turn, &name, &mut outcome);
        }

        // Locations after in/at/to/from
        let loc_caps: Vec<String> = self
            .location
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();
        for name in loc_caps {
            let lowered = name.to_lowercase();
            if NAME_EXCLUSIONS.contains(&lowered.as_str()) {
                continue;
            }
            if ORG_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                continue;
            }
            // Skip anything already linked as a person this pass
            if self
                .resolve(EntityType::Person, &[name.as_str()])
                .is_some_and(|id| outcome.touched.contains(&id))
            {
                continue;
            }
            let id = self.resolve_or_create(EntityType::Location, &[name.as_str()], &name, turn);
            self.touch(&id, turn, &name, &mut outcome);
        }

        // Named events
        let event_caps: Vec<String> = self
            .event
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();
        for name in event_caps {
            let id = self.resolve_or_create(EntityType::Event, &[name.as_str()], &name, turn);
            self.touch(&id, turn, &name, &mut outcome);
        }

        // Pronouns reference recent entities, never create new ones
        let pronouns: Vec<String> = self
            .pronoun
            .captures_iter(text)
            .map(|caps| caps[1].to_lowercase())
            .collect();
        let mut bound_pronouns: HashSet<String> = HashSet::new();
        for pronoun in pronouns {
            if !bound_pronouns.insert(pronoun.clone()) {
                continue;
            }
            if let Some(id) = self.resolve_pronoun(&pronoun, &outcome.touched) {
                self.touch(&id, turn, &pronoun, &mut outcome);
                if self.entities[&id].entity_type == EntityType::Person {
                    persons_touched.push(id);
                }
            } else {
                debug!("Dropping unresolvable pronoun '{}'", pronoun);
            }
        }

        // Attribute accumulation onto the first person in play
        if let Some(person_id) = persons_touched.first().cloned() {
            self.accrue_person_attributes(&person_id, text, turn, &conditions_touched, &mut outcome);
        }

        outcome
    }

    fn accrue_person_attributes(
        &mut self,
        person_id: &str,
        text: &str,
        turn: u32,
        conditions: &[String],
        outcome: &mut LinkOutcome,
    ) {
        let mut observe = |entities: &mut HashMap<String, Entity>, key: &str, value: String| {
            if let Some(entity) = entities.get_mut(person_id) {
                if let Some(previous) = entity.observe_attribute(key, value.clone(), turn) {
                    outcome.conflicts.push(AttributeConflict {
                        entity_id: person_id.to_string(),
                        attribute: key.to_string(),
                        previous,
                        current: value,
                    });
                }
            }
        };

        for pattern in &self.age_patterns {
            if let Some(caps) = pattern.captures(text) {
                observe(&mut self.entities, "age", caps[1].to_string());
                break;
            }
        }

        if let Some(caps) = self.grade.captures(text) {
            let grade: u32 = caps[1].parse().unwrap_or(0);
            observe(&mut self.entities, "grade", grade.to_string());
            if self.entities.get(person_id).and_then(|e| e.attribute("age")).is_none() {
                observe(&mut self.entities, "age", (grade + 5).to_string());
                observe(&mut self.entities, "age_inferred", "true".to_string());
            }
        } else if text.to_lowercase().contains("kindergarten")
            && self.entities.get(person_id).and_then(|e| e.attribute("age")).is_none()
        {
            observe(&mut self.entities, "age", "5".to_string());
            observe(&mut self.entities, "age_inferred", "true".to_string());
        }

        if self.possession.is_match(text) {
            for condition_id in conditions {
                if let Some(name) = self.entities.get(condition_id).map(|e| e.canonical_name.clone())
                {
                    observe(&mut self.entities, "condition", name);
                }
            }
        }
    }

    fn resolve(&self, entity_type: EntityType, lookups: &[&str]) -> Option<String> {
        let mut best: Option<&Entity> = None;
        for entity in self.entities.values() {
            if entity.entity_type != entity_type {
                continue;
            }
            if !lookups.iter().any(|s| surface_matches(entity, s)) {
                continue;
            }
            best = match best {
                None => Some(entity),
                Some(current) => {
                    // Most recent mention wins; equal recency goes to the
                    // longer canonical name
                    if entity.last_turn > current.last_turn
                        || (entity.last_turn == current.last_turn
                            && entity.canonical_name.len() > current.canonical_name.len())
                    {
                        Some(entity)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best.map(|e| e.entity_id.clone())
    }

    fn resolve_or_create(
        &mut self,
        entity_type: EntityType,
        lookups: &[&str],
        display_name: &str,
        turn: u32,
    ) -> String {
        if let Some(id) = self.resolve(entity_type, lookups) {
            self.maybe_upgrade_canonical(&id, display_name);
            return id;
        }

        let id = self.entity_id(entity_type, display_name);
        debug!("New {:?} entity '{}' at turn {}", entity_type, display_name, turn);
        self.entities
            .insert(id.clone(), Entity::new(&id, entity_type, display_name, turn));
        id
    }

    /// Proper names beat descriptive phrases; otherwise the longer form wins
    fn maybe_upgrade_canonical(&mut self, id: &str, candidate: &str) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let current_proper = is_proper_name(&entity.canonical_name);
        let candidate_proper = is_proper_name(candidate);

        let upgrade = (candidate_proper && !current_proper)
            || (candidate_proper == current_proper
                && candidate.len() > entity.canonical_name.len());
        if upgrade && !candidate.eq_ignore_ascii_case(&entity.canonical_name) {
            let old = std::mem::replace(&mut entity.canonical_name, candidate.to_string());
            entity.add_alias(&old);
        }
    }

    fn resolve_pronoun(&self, pronoun: &str, touched_this_pass: &BTreeSet<String>) -> Option<String> {
        let mut best: Option<(&Entity, u32)> = None;
        for entity in self.entities.values() {
            if !pronoun_compatible(pronoun, entity.entity_type) {
                continue;
            }
            let Some(&seen) = self.last_seen_seq.get(&entity.entity_id) else {
                continue;
            };
            // Entities mentioned this pass are always in range
            if !touched_this_pass.contains(&entity.entity_id)
                && self.seq.saturating_sub(seen) > self.pronoun_window
            {
                continue;
            }
            best = match best {
                None => Some((entity, seen)),
                Some((current, current_seen)) => {
                    if seen > current_seen
                        || (seen == current_seen
                            && entity.canonical_name.len() > current.canonical_name.len())
                    {
                        Some((entity, seen))
                    } else {
                        Some((current, current_seen))
                    }
                }
            };
        }
        best.map(|(e, _)| e.entity_id.clone())
    }

    fn touch(&mut self, id: &str, turn: u32, surface: &str, outcome: &mut LinkOutcome) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.add_mention(turn, surface);
            entity.add_alias(surface);
            outcome.mentions_added += 1;
            outcome.touched.insert(id.to_string());
        }
        self.last_seen_seq.insert(id.to_string(), self.seq);
    }

    fn entity_id(&self, entity_type: EntityType, name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}:{}", entity_type.key(), slug(name)),
            None => format!("{}:{}", entity_type.key(), slug(name)),
        }
    }

    /// Entity lookup by id
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// All entities accumulated so far, unordered
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of entities in the graph
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entities have been created
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Raise the importance score of the given entities
    pub fn bump_importance(&mut self, ids: &BTreeSet<String>, score: f64) {
        for id in ids {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.bump_importance(score);
            }
        }
    }

    /// Consume the linker, yielding the final entity graph sorted by id
    pub fn into_entities(self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.entities.into_values().collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }
}

fn surface_matches(entity: &Entity, surface: &str) -> bool {
    let lowered = surface.to_lowercase();
    let canonical = entity.canonical_name.to_lowercase();
    canonical == lowered
        || canonical.contains(&lowered)
        || lowered.contains(&canonical)
        || entity.aliases.contains(&lowered)
}

fn pronoun_compatible(pronoun: &str, entity_type: EntityType) -> bool {
    match pronoun {
        "he" | "she" | "him" | "her" => entity_type == EntityType::Person,
        "they" | "them" => matches!(entity_type, EntityType::Person | EntityType::Other),
        "it" => entity_type != EntityType::Person,
        _ => false,
    }
}

fn is_proper_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if (c == ' ' || c == '-' || c == '_') && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
