//! Remote oracle integration through the full pipeline
//!
//! Drives the pipeline against a wiremock OpenAI-compatible endpoint to
//! verify gating, merging, caching, and failure recovery.

use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keepsake::config::Config;
use keepsake::memory::types::RetentionLevel;
use keepsake::pipeline::MemoryPipeline;
use keepsake::storage::InMemoryStore;
use keepsake::testing::utterances;

fn remote_config(api_url: String, key_env: &str) -> Config {
    let mut config = Config::default();
    config.oracle.enabled = true;
    config.oracle.mock_mode = false;
    config.oracle.api_url = api_url;
    config.oracle.api_key_env = key_env.to_string();
    config
}

fn verdict_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"content": content}}]
    })
}

#[tokio::test]
async fn test_remote_verdict_upgrades_borderline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body(
            r#"{"retention": "long_term", "importance_0_to_30": 20, "categories": ["safety"], "reasoning": "phobia affects travel plans"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    unsafe { std::env::set_var("ORACLE_KEY_UPGRADE", "test-key") };
    let store = Arc::new(InMemoryStore::new());
    let pipeline =
        MemoryPipeline::new(remote_config(server.uri(), "ORACLE_KEY_UPGRADE"), store).unwrap();

    let outcome = pipeline
        .process_transcript("user_1", "Speaker1: Flying absolutely terrifies me.")
        .await
        .unwrap();

    let item = &outcome.items[0];
    assert_eq!(item.retention, RetentionLevel::LongTerm);
    assert_eq!(item.adjusted_score, 20.0);
    assert!(item.reasoning.contains("phobia affects travel plans"));
}

#[tokio::test]
async fn test_non_gated_utterances_never_call_remote() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body("{}")))
        .expect(0)
        .mount(&server)
        .await;

    unsafe { std::env::set_var("ORACLE_KEY_NOGATE", "test-key") };
    let store = Arc::new(InMemoryStore::new());
    let pipeline =
        MemoryPipeline::new(remote_config(server.uri(), "ORACLE_KEY_NOGATE"), store).unwrap();

    // A confident discard and a confident long-term, neither borderline
    // nor emotive without a strong medical match
    let transcript = "\
Speaker1: Hello, how are you today?
Speaker2: I have a severe peanut allergy and it is life-threatening
";
    let outcome = pipeline.process_transcript("user_1", transcript).await.unwrap();
    assert_eq!(outcome.items.len(), 2);
    assert_eq!(pipeline.oracle_usage().unwrap().calls, 0);
}

#[tokio::test]
async fn test_identical_statements_hit_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body(
            r#"{"retention": "long_term", "importance_0_to_30": 18, "categories": [], "reasoning": "strong fear"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    unsafe { std::env::set_var("ORACLE_KEY_CACHE", "test-key") };
    let store = Arc::new(InMemoryStore::new());
    let pipeline =
        MemoryPipeline::new(remote_config(server.uri(), "ORACLE_KEY_CACHE"), store).unwrap();

    let turns = utterances(&[
        (0, "Speaker1", "Flying absolutely terrifies me."),
        (5, "Speaker1", "flying  absolutely TERRIFIES me."),
    ]);
    let outcome = pipeline.process_conversation("user_1", &turns).await.unwrap();

    assert_eq!(outcome.items[0].retention, RetentionLevel::LongTerm);
    assert_eq!(outcome.items[1].retention, RetentionLevel::LongTerm);

    let usage = pipeline.oracle_usage().unwrap();
    assert_eq!(usage.calls, 1);
    assert_eq!(usage.cache_hits, 1);
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_pattern_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    unsafe { std::env::set_var("ORACLE_KEY_FAIL", "test-key") };
    let store = Arc::new(InMemoryStore::new());
    let pipeline =
        MemoryPipeline::new(remote_config(server.uri(), "ORACLE_KEY_FAIL"), store).unwrap();

    let outcome = pipeline
        .process_transcript("user_1", "Speaker1: Flying absolutely terrifies me.")
        .await
        .unwrap();

    // Borderline default: short-term, no oracle note
    let item = &outcome.items[0];
    assert_eq!(item.retention, RetentionLevel::ShortTerm);
    assert!(!item.reasoning.contains("oracle"));
    assert_eq!(pipeline.oracle_usage().unwrap().errors, 1);
}

#[tokio::test]
async fn test_budget_exhaustion_keeps_pattern_verdicts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body(
            r#"{"retention": "long_term", "importance_0_to_30": 18, "categories": [], "reasoning": "strong fear"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    unsafe { std::env::set_var("ORACLE_KEY_BUDGET", "test-key") };
    let mut config = remote_config(server.uri(), "ORACLE_KEY_BUDGET");
    config.oracle.monthly_token_budget = 300;
    let store = Arc::new(InMemoryStore::new());
    let pipeline = MemoryPipeline::new(config, store).unwrap();

    let turns = utterances(&[
        (0, "Speaker1", "Flying absolutely terrifies me."),
        (1, "Speaker1", "Public speaking terrifies me as well, honestly."),
    ]);
    let outcome = pipeline.process_conversation("user_1", &turns).await.unwrap();

    // First consult fits the budget and upgrades; the second statement
    // stays on its pattern verdict
    assert_eq!(outcome.items[0].retention, RetentionLevel::LongTerm);
    assert_eq!(outcome.items[1].retention, RetentionLevel::ShortTerm);
    assert_eq!(pipeline.oracle_usage().unwrap().calls, 1);
}
