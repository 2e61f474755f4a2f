//! Per-user weight learning from explicit feedback
//!
//! Users correct the classifier after the fact ("you forgot something
//! important", "you remembered something trivial"). Each correction
//! nudges the weights of the patterns that matched the statement, clamped
//! to a bounded range, so scoring personalizes without running away.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::types::RetentionLevel;
use crate::storage::MemoryStore;

/// How a user corrected (or confirmed) a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    /// Expected long-term, system retained less
    ForgotImportant,
    /// Expected immediate discard, system retained more
    RememberedTrivial,
    /// Retention was right, category was not
    WrongCategory,
    /// System got it right
    Correct,
}

impl FeedbackType {
    /// Derive the feedback type from expected vs. actual retention
    pub fn infer(actual: RetentionLevel, expected: RetentionLevel) -> Self {
        if actual == expected {
            FeedbackType::Correct
        } else if expected == RetentionLevel::LongTerm {
            FeedbackType::ForgotImportant
        } else if expected == RetentionLevel::ImmediateDiscard {
            FeedbackType::RememberedTrivial
        } else {
            FeedbackType::WrongCategory
        }
    }
}

/// One learned weight row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserWeight {
    /// Signed adjustment added to the pattern's contribution
    pub adjustment: f64,
    /// How many feedback events touched this row
    pub feedback_count: u32,
}

/// A recorded feedback event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub user_id: String,
    pub statement: String,
    pub actual: RetentionLevel,
    pub expected: RetentionLevel,
    pub feedback_type: FeedbackType,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        user_id: impl Into<String>,
        statement: impl Into<String>,
        actual: RetentionLevel,
        expected: RetentionLevel,
        feedback_type: FeedbackType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            statement: statement.into(),
            actual,
            expected,
            feedback_type,
            timestamp: Utc::now(),
        }
    }
}

/// Applies feedback to per-user pattern weights through the store
pub struct UserWeightStore {
    store: Arc<dyn MemoryStore>,
    adjustment_limit: f64,
    /// One lock per user so concurrent feedback never loses an update
    user_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Categories users flagged as wrong, per user, with a flag count
    category_flags: Mutex<HashMap<String, HashMap<String, u32>>>,
}

/// Adjustment applied per matched pattern for "forgot important"
const FORGOT_IMPORTANT_DELTA: f64 = 2.0;
/// Adjustment applied per matched pattern for "remembered trivial"
const REMEMBERED_TRIVIAL_DELTA: f64 = -2.0;

impl UserWeightStore {
    pub fn new(store: Arc<dyn MemoryStore>, adjustment_limit: f64) -> Self {
        Self {
            store,
            adjustment_limit,
            user_locks: Mutex::new(HashMap::new()),
            category_flags: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.user_locks
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Current adjustments for a user, keyed by pattern name
    pub async fn load(&self, user_id: &str) -> Result<HashMap<String, f64>> {
        let rows = self.store.load_user_weights(user_id).await?;
        Ok(rows
            .into_iter()
            .map(|(name, row)| (name, row.adjustment))
            .collect())
    }

    /// Apply one feedback event to every pattern that matched the statement
    ///
    /// The read-modify-write runs under a per-user lock; readers observe
    /// last-committed state. Returns the recorded feedback event.
    pub async fn apply_feedback(
        &self,
        user_id: &str,
        statement: &str,
        actual: RetentionLevel,
        expected: RetentionLevel,
        feedback_type: FeedbackType,
        matched_patterns: &[String],
        matched_categories: &[String],
    ) -> Result<FeedbackRecord> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let delta = match feedback_type {
            FeedbackType::ForgotImportant => FORGOT_IMPORTANT_DELTA,
            FeedbackType::RememberedTrivial => REMEMBERED_TRIVIAL_DELTA,
            FeedbackType::WrongCategory | FeedbackType::Correct => 0.0,
        };

        if feedback_type == FeedbackType::WrongCategory {
            let mut flags = self.category_flags.lock();
            let user_flags = flags.entry(user_id.to_string()).or_default();
            for category in matched_categories {
                *user_flags.entry(category.clone()).or_insert(0) += 1;
            }
        }

        let mut rows = self.store.load_user_weights(user_id).await?;
        for name in matched_patterns {
            let row = rows.entry(name.clone()).or_default();
            row.adjustment =
                (row.adjustment + delta).clamp(-self.adjustment_limit, self.adjustment_limit);
            row.feedback_count += 1;
            self.store.save_user_weight(user_id, name, row).await?;
            debug!(
                "User {} pattern {} adjusted to {:+.1} ({} events)",
                user_id, name, row.adjustment, row.feedback_count
            );
        }

        let record = FeedbackRecord::new(user_id, statement, actual, expected, feedback_type);
        self.store.append_feedback(&record).await?;
        info!(
            "Recorded {:?} feedback for user {} across {} patterns",
            feedback_type,
            user_id,
            matched_patterns.len()
        );
        Ok(record)
    }

    /// Categories the user has flagged as miscategorized, with counts
    pub fn flagged_categories(&self, user_id: &str) -> HashMap<String, u32> {
        self.category_flags
            .lock()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}
