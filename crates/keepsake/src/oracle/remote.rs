//! Remote oracle provider using OpenAI-compatible APIs
//!
//! Sends a single structured classification query per utterance and parses
//! the JSON verdict out of the completion. The API key is read from the
//! environment variable named in the configuration.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::OracleConfig;
use crate::memory::types::RetentionLevel;
use crate::oracle::provider::OracleProvider;
use crate::oracle::types::{OracleError, OracleVerdict, Result};

const SYSTEM_PROMPT: &str = "You classify conversational statements by how long an assistant \
should remember them. Reply with a JSON object: {\"retention\": \"long_term\" | \"short_term\" \
| \"immediate_discard\", \"importance_0_to_30\": number, \"categories\": [string], \
\"reasoning\": string}. Long-term covers medical conditions, safety, identity, and major life \
events; short-term covers near-term context; immediate-discard covers greetings and filler. \
Be conservative: prefer longer retention when in doubt.";

/// Remote oracle over an OpenAI-compatible chat-completions endpoint
#[derive(Debug)]
pub struct RemoteOracle {
    client: Client,
    config: OracleConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// JSON shape the oracle is asked to produce
#[derive(Debug, Deserialize)]
struct VerdictJson {
    retention: String,
    importance_0_to_30: f64,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

impl RemoteOracle {
    /// Create a remote oracle from configuration
    ///
    /// Fails when the API key environment variable is unset.
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            OracleError::Config(format!("API key env var '{}' not set", config.api_key_env))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        info!(
            "RemoteOracle initialized with model: {}, api_url: {}",
            config.model, config.api_url
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    /// Call the remote API with exponential backoff on rate limiting
    async fn call_api(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.2,
            max_tokens: 300,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        debug!("Calling oracle API at: {}", url);

        let mut last_error = None;
        let mut delay = Duration::from_millis(250);
        const MAX_RETRIES: u32 = 3;

        for attempt in 0..MAX_RETRIES {
            match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == 429 {
                        warn!(
                            "Rate limited on attempt {}/{}, waiting {:?}",
                            attempt + 1,
                            MAX_RETRIES,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        return Err(OracleError::Api(format!(
                            "API returned {status}: {error_text}"
                        )));
                    }

                    let completion: ChatCompletionResponse = response
                        .json()
                        .await
                        .map_err(|e| OracleError::Parse(e.to_string()))?;

                    return completion
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| OracleError::Api("Empty response".to_string()));
                }
                Err(e) => {
                    if e.is_timeout() {
                        return Err(OracleError::Timeout);
                    }
                    let err_msg = e.to_string();
                    last_error = Some(err_msg.clone());
                    if attempt < MAX_RETRIES - 1 {
                        warn!(
                            "Oracle request failed on attempt {}/{}, retrying: {}",
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(OracleError::Transport(format!(
            "Failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    fn parse_verdict(content: &str) -> Result<OracleVerdict> {
        let parsed: VerdictJson = serde_json::from_str(content.trim())
            .map_err(|e| OracleError::Parse(format!("bad verdict JSON: {e}")))?;

        let retention = match parsed.retention.to_lowercase().as_str() {
            "long_term" => RetentionLevel::LongTerm,
            "immediate_discard" | "immediate" => RetentionLevel::ImmediateDiscard,
            _ => RetentionLevel::ShortTerm,
        };

        Ok(OracleVerdict::new(
            retention,
            parsed.importance_0_to_30,
            parsed.categories,
            parsed.reasoning,
        ))
    }
}

#[async_trait]
impl OracleProvider for RemoteOracle {
    async fn classify(&self, text: &str) -> Result<OracleVerdict> {
        let prompt = format!("Classify this conversation statement:\n\n\"{text}\"");
        let content = self.call_api(&prompt).await?;
        debug!("Oracle response: {}", content);
        Self::parse_verdict(&content)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(api_url: String) -> OracleConfig {
        OracleConfig {
            enabled: true,
            api_url,
            api_key_env: "TEST_ORACLE_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 2000,
            ..OracleConfig::default()
        }
    }

    fn verdict_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"content": content}}]
        })
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        unsafe { env::remove_var("TEST_ORACLE_KEY_UNSET") };
        let mut config = create_test_config("https://api.example.com/v1".to_string());
        config.api_key_env = "TEST_ORACLE_KEY_UNSET".to_string();
        let result = RemoteOracle::new(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("TEST_ORACLE_KEY_UNSET"));
    }

    #[tokio::test]
    async fn test_classify_parses_verdict() {
        let mock_server = MockServer::start().await;

        let body = verdict_body(
            r#"{"retention": "long_term", "importance_0_to_30": 22, "categories": ["medical"], "reasoning": "allergy information"}"#,
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        unsafe { env::set_var("TEST_ORACLE_KEY", "test-key") };
        let oracle = RemoteOracle::new(&create_test_config(mock_server.uri())).unwrap();

        let verdict = oracle.classify("I have a peanut allergy").await.unwrap();
        assert_eq!(verdict.retention, RetentionLevel::LongTerm);
        assert_eq!(verdict.importance, 22.0);
        assert_eq!(verdict.categories, vec!["medical"]);
    }

    #[tokio::test]
    async fn test_rate_limit_retry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        let body = verdict_body(
            r#"{"retention": "short_term", "importance_0_to_30": 8, "categories": [], "reasoning": "context"}"#,
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        unsafe { env::set_var("TEST_ORACLE_KEY", "test-key") };
        let oracle = RemoteOracle::new(&create_test_config(mock_server.uri())).unwrap();

        let verdict = oracle.classify("test").await.unwrap();
        assert_eq!(verdict.retention, RetentionLevel::ShortTerm);
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        unsafe { env::set_var("TEST_ORACLE_KEY", "test-key") };
        let oracle = RemoteOracle::new(&create_test_config(mock_server.uri())).unwrap();

        let result = oracle.classify("test").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_invalid_verdict_json_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verdict_body("not json")))
            .mount(&mock_server)
            .await;

        unsafe { env::set_var("TEST_ORACLE_KEY", "test-key") };
        let oracle = RemoteOracle::new(&create_test_config(mock_server.uri())).unwrap();

        let result = oracle.classify("test").await;
        assert!(matches!(result, Err(OracleError::Parse(_))));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(verdict_body("{}"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&mock_server)
            .await;

        unsafe { env::set_var("TEST_ORACLE_KEY", "test-key") };
        let mut config = create_test_config(mock_server.uri());
        config.timeout_ms = 50;
        let oracle = RemoteOracle::new(&config).unwrap();

        let result = oracle.classify("test").await;
        assert!(matches!(result, Err(OracleError::Timeout)));
    }

    #[test]
    fn test_parse_verdict_retention_aliases() {
        let verdict = RemoteOracle::parse_verdict(
            r#"{"retention": "immediate", "importance_0_to_30": 1}"#,
        )
        .unwrap();
        assert_eq!(verdict.retention, RetentionLevel::ImmediateDiscard);

        let verdict = RemoteOracle::parse_verdict(
            r#"{"retention": "unknown", "importance_0_to_30": 9}"#,
        )
        .unwrap();
        assert_eq!(verdict.retention, RetentionLevel::ShortTerm);
    }
}
