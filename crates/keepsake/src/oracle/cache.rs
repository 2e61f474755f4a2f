//! Verdict cache for the semantic oracle
//!
//! Bounded LRU cache keyed by a digest of the normalized utterance text.
//! Normalization lowercases and collapses whitespace, so trivially
//! reformatted repeats of the same statement never trigger a second
//! remote call. Keys carry no user identity; the oracle is user-agnostic.

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;

use crate::oracle::types::OracleVerdict;

/// Default maximum number of cached verdicts
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Cache key: SHA-256 of the lowercased, whitespace-collapsed text
pub fn cache_key(text: &str) -> String {
    let normalized = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{digest:x}")
}

/// Thread-safe LRU cache of oracle verdicts
pub struct VerdictCache {
    inner: Mutex<LruCache<String, OracleVerdict>>,
}

impl VerdictCache {
    /// Create a cache bounded to `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Look up a verdict for the given raw text
    pub fn get(&self, text: &str) -> Option<OracleVerdict> {
        self.inner.lock().get(&cache_key(text)).cloned()
    }

    /// Store a verdict for the given raw text
    pub fn put(&self, text: &str, verdict: OracleVerdict) {
        self.inner.lock().put(cache_key(text), verdict);
    }

    /// Number of cached verdicts
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
