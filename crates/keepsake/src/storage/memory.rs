//! In-memory persistence backend
//!
//! Backs tests and offline runs. Writes can be made to fail on demand so
//! callers can exercise persistence error paths.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::entity::Entity;
use crate::error::{KeepsakeError, Result};
use crate::learning::{FeedbackRecord, UserWeight};
use crate::memory::MemoryItem;
use crate::storage::MemoryStore;

/// Map-backed store with interior mutability
#[derive(Default)]
pub struct InMemoryStore {
    weights: RwLock<HashMap<String, HashMap<String, UserWeight>>>,
    items: RwLock<HashMap<String, Vec<MemoryItem>>>,
    entities: RwLock<HashMap<String, HashMap<String, Entity>>>,
    feedback: RwLock<Vec<FeedbackRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a persistence error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(KeepsakeError::Persistence("write rejected".to_string()));
        }
        Ok(())
    }

    /// Items stored for a conversation
    pub fn items_for(&self, conversation_id: &str) -> Vec<MemoryItem> {
        self.items
            .read()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Entities stored for a user, sorted by id
    pub fn entities_for(&self, user_id: &str) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .entities
            .read()
            .get(user_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }

    /// All feedback recorded so far
    pub fn feedback_records(&self) -> Vec<FeedbackRecord> {
        self.feedback.read().clone()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn load_user_weights(&self, user_id: &str) -> Result<HashMap<String, UserWeight>> {
        Ok(self.weights.read().get(user_id).cloned().unwrap_or_default())
    }

    async fn save_user_weight(
        &self,
        user_id: &str,
        pattern_name: &str,
        weight: &UserWeight,
    ) -> Result<()> {
        self.check_writable()?;
        self.weights
            .write()
            .entry(user_id.to_string())
            .or_default()
            .insert(pattern_name.to_string(), weight.clone());
        Ok(())
    }

    async fn append_memory_items(&self, conversation_id: &str, items: &[MemoryItem]) -> Result<()> {
        self.check_writable()?;
        self.items
            .write()
            .entry(conversation_id.to_string())
            .or_default()
            .extend_from_slice(items);
        Ok(())
    }

    async fn upsert_entities(&self, user_id: &str, entities: &[Entity]) -> Result<()> {
        self.check_writable()?;
        let mut guard = self.entities.write();
        let user_entities = guard.entry(user_id.to_string()).or_default();
        for entity in entities {
            user_entities.insert(entity.entity_id.clone(), entity.clone());
        }
        Ok(())
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        self.check_writable()?;
        self.feedback.write().push(record.clone());
        Ok(())
    }
}
