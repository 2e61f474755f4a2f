//! Test utilities shared across unit and integration tests

use std::sync::Arc;

use crate::config::Config;
use crate::memory::types::Utterance;
use crate::pipeline::MemoryPipeline;
use crate::storage::InMemoryStore;

/// Configuration with the deterministic mock oracle enabled
pub fn mock_oracle_config() -> Config {
    let mut config = Config::default();
    config.oracle.enabled = true;
    config.oracle.mock_mode = true;
    config
}

/// Pipeline over an in-memory store, returning both
pub fn test_pipeline(config: Config) -> (MemoryPipeline, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let pipeline =
        MemoryPipeline::new(config, store.clone()).expect("test pipeline should build");
    (pipeline, store)
}

/// Utterances from `(turn_index, speaker, text)` triples
pub fn utterances(turns: &[(u32, &str, &str)]) -> Vec<Utterance> {
    turns
        .iter()
        .map(|(turn, speaker, text)| Utterance::new(*turn, *speaker, *text))
        .collect()
}
