use serde::Deserialize;

/// Main configuration structure for Keepsake
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Scoring thresholds and modifier token lists
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Semantic oracle fallback configuration
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Cross-turn entity linking configuration
    #[serde(default)]
    pub entities: EntityConfig,
    /// Temporal decay of short-term items
    #[serde(default)]
    pub decay: DecayConfig,
    /// Per-user weight learning configuration
    #[serde(default)]
    pub learning: LearningConfig,
}

/// Retention thresholds and scorer modifier vocabularies
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Adjusted score at or above which an item is kept long-term
    #[serde(default = "default_long_term_threshold")]
    pub long_term_threshold: f64,
    /// Lower bound of the borderline band handed to the oracle
    #[serde(default = "default_borderline_low")]
    pub borderline_low: f64,
    /// Upper bound of the borderline band
    #[serde(default = "default_borderline_high")]
    pub borderline_high: f64,
    /// Adjusted score at or above which an item is kept short-term
    #[serde(default = "default_short_term_threshold")]
    pub short_term_threshold: f64,
    /// Tokens that amplify severity-taggable matches (+5 each)
    #[serde(default = "default_severity_triggers")]
    pub severity_triggers: Vec<String>,
    /// Absolute temporal markers (+3 once)
    #[serde(default = "default_permanence_markers")]
    pub permanence_markers: Vec<String>,
    /// Immediacy markers (+4 once)
    #[serde(default = "default_urgency_markers")]
    pub urgency_markers: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            long_term_threshold: default_long_term_threshold(),
            borderline_low: default_borderline_low(),
            borderline_high: default_borderline_high(),
            short_term_threshold: default_short_term_threshold(),
            severity_triggers: default_severity_triggers(),
            permanence_markers: default_permanence_markers(),
            urgency_markers: default_urgency_markers(),
        }
    }
}

fn default_long_term_threshold() -> f64 {
    15.0
}

fn default_borderline_low() -> f64 {
    10.0
}

fn default_borderline_high() -> f64 {
    14.0
}

fn default_short_term_threshold() -> f64 {
    3.0
}

fn default_severity_triggers() -> Vec<String> {
    ["severe", "severely", "life-threatening", "critical", "emergency"]
        .map(String::from)
        .to_vec()
}

fn default_permanence_markers() -> Vec<String> {
    ["always", "never", "every", "forever"].map(String::from).to_vec()
}

fn default_urgency_markers() -> Vec<String> {
    ["now", "today", "immediately", "right now"]
        .map(String::from)
        .to_vec()
}

/// Semantic oracle fallback configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Enable the oracle fallback for borderline or emotive utterances
    #[serde(default = "default_oracle_enabled")]
    pub enabled: bool,
    /// Return deterministic verdicts without any remote call
    #[serde(default = "default_oracle_mock_mode")]
    pub mock_mode: bool,
    /// Per-call timeout in milliseconds
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum number of cached verdicts (LRU eviction)
    #[serde(default = "default_oracle_cache_max_entries")]
    pub cache_max_entries: usize,
    /// Monthly token budget; the oracle disables itself once exhausted
    #[serde(default = "default_oracle_monthly_token_budget")]
    pub monthly_token_budget: u64,
    /// Emotive tokens that gate an oracle consult
    #[serde(default = "default_emotive_lexicon")]
    pub emotive_lexicon: Vec<String>,
    /// Remote API endpoint URL (OpenAI-compatible)
    #[serde(default)]
    pub api_url: String,
    /// Environment variable name for the API key
    #[serde(default = "default_oracle_api_key_env")]
    pub api_key_env: String,
    /// Model identifier for the remote API
    #[serde(default = "default_oracle_model")]
    pub model: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: default_oracle_enabled(),
            mock_mode: default_oracle_mock_mode(),
            timeout_ms: default_oracle_timeout_ms(),
            cache_max_entries: default_oracle_cache_max_entries(),
            monthly_token_budget: default_oracle_monthly_token_budget(),
            emotive_lexicon: default_emotive_lexicon(),
            api_url: String::new(),
            api_key_env: default_oracle_api_key_env(),
            model: default_oracle_model(),
        }
    }
}

fn default_oracle_enabled() -> bool {
    false
}

fn default_oracle_mock_mode() -> bool {
    false
}

fn default_oracle_timeout_ms() -> u64 {
    2000
}

fn default_oracle_cache_max_entries() -> usize {
    10_000
}

fn default_oracle_monthly_token_budget() -> u64 {
    1_000_000
}

fn default_emotive_lexicon() -> Vec<String> {
    [
        "terrifies",
        "terrified",
        "terrifying",
        "devastated",
        "heartbroken",
        "thrilled",
        "scared",
        "panic",
        "desperate",
        "traumatic",
    ]
    .map(String::from)
    .to_vec()
}

fn default_oracle_api_key_env() -> String {
    "ORACLE_API_KEY".to_string()
}

fn default_oracle_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Cross-turn entity linking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    /// Enable entity extraction and linking
    #[serde(default = "default_entities_enabled")]
    pub enabled: bool,
    /// How many linked utterances back a pronoun may bind
    #[serde(default = "default_pronoun_window")]
    pub pronoun_window: u32,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            enabled: default_entities_enabled(),
            pronoun_window: default_pronoun_window(),
        }
    }
}

fn default_entities_enabled() -> bool {
    true
}

fn default_pronoun_window() -> u32 {
    3
}

/// Temporal decay configuration for short-term items
#[derive(Debug, Clone, Deserialize)]
pub struct DecayConfig {
    /// Grace period in turns before decay starts
    #[serde(default = "default_decay_window_turns")]
    pub window_turns: u32,
    /// Score lost per turn past the window
    #[serde(default = "default_decay_rate")]
    pub rate: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            window_turns: default_decay_window_turns(),
            rate: default_decay_rate(),
        }
    }
}

fn default_decay_window_turns() -> u32 {
    5
}

fn default_decay_rate() -> f64 {
    0.5
}

/// Per-user weight learning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LearningConfig {
    /// Enable reading and writing per-user pattern weights
    #[serde(default = "default_learning_enabled")]
    pub enabled: bool,
    /// Clamp for a single pattern's learned adjustment, per user
    #[serde(default = "default_adjustment_limit")]
    pub adjustment_limit: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: default_learning_enabled(),
            adjustment_limit: default_adjustment_limit(),
        }
    }
}

fn default_learning_enabled() -> bool {
    true
}

fn default_adjustment_limit() -> f64 {
    10.0
}

impl Config {
    /// Parse a configuration from a TOML string
    pub fn from_toml(raw: &str) -> crate::error::Result<Self> {
        toml::from_str(raw).map_err(|e| crate::error::KeepsakeError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.scoring.long_term_threshold, 15.0);
        assert_eq!(config.scoring.borderline_low, 10.0);
        assert_eq!(config.scoring.borderline_high, 14.0);
        assert_eq!(config.scoring.short_term_threshold, 3.0);
        assert!(!config.oracle.enabled);
        assert!(!config.oracle.mock_mode);
        assert_eq!(config.oracle.timeout_ms, 2000);
        assert_eq!(config.oracle.cache_max_entries, 10_000);
        assert!(config.entities.enabled);
        assert_eq!(config.entities.pronoun_window, 3);
        assert_eq!(config.decay.window_turns, 5);
        assert_eq!(config.decay.rate, 0.5);
        assert!(config.learning.enabled);
        assert_eq!(config.learning.adjustment_limit, 10.0);
    }

    #[test]
    fn test_default_token_lists() {
        let config = ScoringConfig::default();
        assert!(config.severity_triggers.contains(&"life-threatening".to_string()));
        assert_eq!(config.severity_triggers.len(), 5);
        assert_eq!(config.permanence_markers.len(), 4);
        assert!(config.urgency_markers.contains(&"right now".to_string()));

        let oracle = OracleConfig::default();
        assert!(oracle.emotive_lexicon.contains(&"terrifies".to_string()));
        assert!(oracle.emotive_lexicon.contains(&"panic".to_string()));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[scoring]
long_term_threshold = 18.0
borderline_low = 12.0
borderline_high = 17.0
short_term_threshold = 4.0

[oracle]
enabled = true
mock_mode = true
timeout_ms = 500
cache_max_entries = 100
api_url = "https://api.openai.com/v1"
model = "gpt-4o"

[entities]
enabled = false

[decay]
window_turns = 3
rate = 1.0

[learning]
enabled = false
"#;

        let config = Config::from_toml(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.scoring.long_term_threshold, 18.0);
        assert_eq!(config.scoring.borderline_low, 12.0);
        assert!(config.oracle.enabled);
        assert!(config.oracle.mock_mode);
        assert_eq!(config.oracle.timeout_ms, 500);
        assert_eq!(config.oracle.cache_max_entries, 100);
        assert_eq!(config.oracle.api_url, "https://api.openai.com/v1");
        assert_eq!(config.oracle.model, "gpt-4o");
        assert!(!config.entities.enabled);
        assert_eq!(config.decay.window_turns, 3);
        assert_eq!(config.decay.rate, 1.0);
        assert!(!config.learning.enabled);
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[oracle]
enabled = true
"#;

        let config = Config::from_toml(toml_str).expect("Failed to parse partial TOML");
        assert!(config.oracle.enabled);
        // Everything else falls back to defaults
        assert_eq!(config.oracle.timeout_ms, 2000);
        assert_eq!(config.oracle.api_key_env, "ORACLE_API_KEY");
        assert_eq!(config.scoring.long_term_threshold, 15.0);
        assert!(config.entities.enabled);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = Config::from_toml("scoring = \"nope\"");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Configuration error"));
    }

    #[test]
    fn test_custom_token_lists_from_toml() {
        let toml_str = r#"
[scoring]
severity_triggers = ["acute"]
urgency_markers = ["asap"]

[oracle]
emotive_lexicon = ["dread"]
"#;

        let config = Config::from_toml(toml_str).expect("Failed to parse TOML");
        assert_eq!(config.scoring.severity_triggers, vec!["acute".to_string()]);
        assert_eq!(config.scoring.urgency_markers, vec!["asap".to_string()]);
        assert_eq!(config.oracle.emotive_lexicon, vec!["dread".to_string()]);
        // Untouched list keeps its default
        assert_eq!(config.scoring.permanence_markers.len(), 4);
    }
}
