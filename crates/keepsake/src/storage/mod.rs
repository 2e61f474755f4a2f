//! Persistence interface consumed by the core
//!
//! The pipeline talks to storage only through the `MemoryStore` trait.
//! The crate ships an in-memory implementation; a production backend
//! implements the same five operations over its own tables.

pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::entity::Entity;
use crate::error::Result;
use crate::learning::{FeedbackRecord, UserWeight};
use crate::memory::MemoryItem;

/// Abstract persistence operations the core depends on
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Learned weight rows for a user; absent users yield an empty map
    async fn load_user_weights(&self, user_id: &str) -> Result<HashMap<String, UserWeight>>;

    /// Create or update one `(user, pattern)` weight row
    async fn save_user_weight(
        &self,
        user_id: &str,
        pattern_name: &str,
        weight: &UserWeight,
    ) -> Result<()>;

    /// Append the items produced for a conversation
    async fn append_memory_items(&self, conversation_id: &str, items: &[MemoryItem]) -> Result<()>;

    /// Insert or update a user's entities by id
    async fn upsert_entities(&self, user_id: &str, entities: &[Entity]) -> Result<()>;

    /// Append one feedback record
    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<()>;
}
