//! Pipeline orchestration
//!
//! Composes the scorer, oracle, contradiction and decay passes, entity
//! linker, and the learning store into the per-conversation flow. Within
//! a conversation processing is strictly sequential; separate
//! conversations can run on separate pipelines (or one shared pipeline)
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::entity::{Entity, EntityLinker};
use crate::error::Result;
use crate::learning::{FeedbackRecord, FeedbackType, UserWeightStore};
use crate::memory::ingestion::parse_transcript;
use crate::memory::types::{MemoryItem, RetentionLevel, ScoreSource, TraceEntry, Utterance};
use crate::memory::{ContradictionDetector, DecayEngine};
use crate::oracle::{merge_verdict, OracleUsage, SemanticOracle};
use crate::pattern::PatternRegistry;
use crate::scoring::PatternScorer;
use crate::storage::MemoryStore;

/// Everything a processed conversation produces
#[derive(Debug, Clone)]
pub struct ConversationOutcome {
    pub conversation_id: String,
    /// Memory items in input turn order
    pub items: Vec<MemoryItem>,
    /// Final entity graph, sorted by entity id
    pub entities: Vec<Entity>,
}

/// The assembled classification pipeline
pub struct MemoryPipeline {
    config: Config,
    scorer: PatternScorer,
    oracle: Option<SemanticOracle>,
    detector: ContradictionDetector,
    decay: DecayEngine,
    store: Arc<dyn MemoryStore>,
    weights: UserWeightStore,
}

impl MemoryPipeline {
    /// Build a pipeline over the built-in pattern catalog
    pub fn new(config: Config, store: Arc<dyn MemoryStore>) -> Result<Self> {
        let registry = Arc::new(PatternRegistry::builtin()?);
        Self::with_registry(config, registry, store)
    }

    /// Build a pipeline over a caller-supplied catalog
    pub fn with_registry(
        config: Config,
        registry: Arc<PatternRegistry>,
        store: Arc<dyn MemoryStore>,
    ) -> Result<Self> {
        let scorer = PatternScorer::new(registry, config.scoring.clone())?;
        let oracle = SemanticOracle::from_config(&config.oracle)?;
        let decay = DecayEngine::new(&config.decay, &config.scoring);
        let weights = UserWeightStore::new(store.clone(), config.learning.adjustment_limit);

        info!(
            "Pipeline ready (oracle={}, entities={}, learning={})",
            oracle.as_ref().map(|o| o.provider_name()).unwrap_or("off"),
            config.entities.enabled,
            config.learning.enabled
        );

        Ok(Self {
            config,
            scorer,
            oracle,
            detector: ContradictionDetector::new(),
            decay,
            store,
            weights,
        })
    }

    /// Classify a whole conversation for one user
    ///
    /// Produces one memory item per utterance, in turn order, plus the
    /// final entity graph, and persists both through the store.
    pub async fn process_conversation(
        &self,
        user_id: &str,
        utterances: &[Utterance],
    ) -> Result<ConversationOutcome> {
        let user_weights = if self.config.learning.enabled {
            self.weights.load(user_id).await?
        } else {
            HashMap::new()
        };

        let mut linker = if self.config.entities.enabled {
            Some(EntityLinker::with_namespace(
                &self.config.entities,
                Some(user_id),
            )?)
        } else {
            None
        };

        let mut items: Vec<MemoryItem> = Vec::with_capacity(utterances.len());

        for utterance in utterances {
            let item = self.classify_utterance(utterance, &user_weights).await;
            items.push(item);
            let newest = items.len() - 1;

            // Later statements supersede earlier contradicted ones
            let superseded = self.detector.review(&mut items, newest);
            if superseded > 0 {
                let (level, _) = self.scorer.decide(items[newest].adjusted_score);
                if level.rank() > items[newest].retention.rank() {
                    items[newest].retention = level;
                }
            }

            // Noise never accrues entities
            if let Some(linker) = linker.as_mut() {
                if items[newest].is_retained() {
                    let outcome = linker.link(utterance);
                    linker.bump_importance(&outcome.touched, items[newest].adjusted_score);
                    items[newest].entity_refs = outcome.touched;
                    if !outcome.conflicts.is_empty() {
                        items[newest]
                            .reasoning
                            .push_str(" | conflicting attribute value recorded");
                    }
                }
            }

            self.decay.apply(&mut items, utterance.turn_index);
        }

        let entities = linker.map(EntityLinker::into_entities).unwrap_or_default();
        let conversation_id = Uuid::new_v4().to_string();

        self.store.append_memory_items(&conversation_id, &items).await?;
        if !entities.is_empty() {
            self.store.upsert_entities(user_id, &entities).await?;
        }

        debug!(
            "Conversation {} produced {} items, {} entities",
            conversation_id,
            items.len(),
            entities.len()
        );

        Ok(ConversationOutcome {
            conversation_id,
            items,
            entities,
        })
    }

    /// Parse a `Speaker: text` transcript and classify it
    pub async fn process_transcript(
        &self,
        user_id: &str,
        raw: &str,
    ) -> Result<ConversationOutcome> {
        let utterances = parse_transcript(raw);
        self.process_conversation(user_id, &utterances).await
    }

    async fn classify_utterance(
        &self,
        utterance: &Utterance,
        user_weights: &HashMap<String, f64>,
    ) -> MemoryItem {
        let breakdown = self.scorer.score(utterance, user_weights);
        let mut adjusted = breakdown.adjusted_score;
        let mut retention = breakdown.retention;
        let mut reasoning = breakdown.summary();
        let mut trace = breakdown.trace.clone();

        if let Some(oracle) = &self.oracle {
            if oracle.should_consult(&utterance.text, &breakdown) {
                if let Some(verdict) = oracle.classify(&utterance.text).await {
                    let merged = merge_verdict(
                        breakdown.raw_score,
                        adjusted,
                        retention,
                        &verdict,
                        self.config.scoring.long_term_threshold,
                    );
                    trace.push(TraceEntry::new(ScoreSource::OracleAdjust, merged.delta));
                    adjusted = merged.adjusted_score;
                    retention = merged.retention;
                    reasoning.push_str(" | ");
                    reasoning.push_str(&merged.note);
                }
            }
        }

        MemoryItem {
            utterance: utterance.reference(),
            text: utterance.text.clone(),
            raw_score: breakdown.raw_score,
            adjusted_score: adjusted,
            retention,
            trace,
            categories: breakdown.categories,
            entity_refs: Default::default(),
            superseded_by: None,
            reasoning,
            decay_penalty: 0.0,
            decayed_out: false,
        }
    }

    /// Record user feedback on a classified statement
    ///
    /// Returns `None` when learning is disabled. The feedback type is
    /// derived from expected vs. actual retention; weight changes apply
    /// to the patterns the statement matches.
    pub async fn feedback(
        &self,
        user_id: &str,
        statement: &str,
        actual: RetentionLevel,
        expected: RetentionLevel,
    ) -> Result<Option<FeedbackRecord>> {
        if !self.config.learning.enabled {
            warn!("Learning disabled, feedback not recorded");
            return Ok(None);
        }

        let feedback_type = FeedbackType::infer(actual, expected);
        let matched = self.scorer.matches_for(statement);
        let names: Vec<String> = matched.iter().map(|m| m.name.clone()).collect();
        let categories: Vec<String> = matched.iter().map(|m| m.category.clone()).collect();

        let record = self
            .weights
            .apply_feedback(
                user_id,
                statement,
                actual,
                expected,
                feedback_type,
                &names,
                &categories,
            )
            .await?;
        Ok(Some(record))
    }

    /// Oracle usage counters, when the oracle is enabled
    pub fn oracle_usage(&self) -> Option<OracleUsage> {
        self.oracle.as_ref().map(SemanticOracle::usage)
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &Config {
        &self.config
    }
}
