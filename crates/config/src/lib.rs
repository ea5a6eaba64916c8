//! Configuration loading, validation, and management for Voiceprint.
//!
//! Loads configuration from `~/.voiceprint/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.voiceprint/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model, used for orchestration, extraction and generation
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Orchestrator temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Orchestration loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Fingerprint, generation and validation settings
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Token budget and summarization settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Upstream timeout and retry settings
    #[serde(default)]
    pub reliability: ReliabilityConfig,

    /// Where collaborator data lives
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    2048
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("agent", &self.agent)
            .field("voice", &self.voice)
            .field("context", &self.context)
            .field("reliability", &self.reliability)
            .field("storage", &self.storage)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model turns per request before the loop gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Prior turns injected before the current one
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_iterations() -> u32 {
    8
}
fn default_history_limit() -> usize {
    20
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Fingerprints and knowledge maps older than this are rebuilt
    #[serde(default = "default_ttl_hours")]
    pub fingerprint_ttl_hours: u32,

    /// Exemplars fed to extraction (at most 10)
    #[serde(default = "default_exemplar_limit")]
    pub exemplar_limit: usize,

    /// Exemplars embedded in the generation prompt
    #[serde(default = "default_generation_exemplars")]
    pub generation_exemplars: usize,

    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,

    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,

    /// Below this score a stricter regeneration is attempted
    #[serde(default = "default_regenerate_threshold")]
    pub regenerate_threshold: u8,

    /// Below this score after regeneration the text is rejected
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: u8,

    /// Judged similarity below this adds an issue
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: u8,

    /// Allowed deviation from the fingerprint's mean sentence length, in words
    #[serde(default = "default_sentence_tolerance")]
    pub sentence_length_tolerance: f32,

    /// EMA rate used when a pattern is confirmed
    #[serde(default = "default_learning_rate")]
    pub pattern_learning_rate: f64,

    #[serde(default)]
    pub lexicon: LexiconConfig,
}

fn default_ttl_hours() -> u32 {
    24
}
fn default_exemplar_limit() -> usize {
    10
}
fn default_generation_exemplars() -> usize {
    3
}
fn default_generation_temperature() -> f32 {
    0.9
}
fn default_extraction_temperature() -> f32 {
    0.2
}
fn default_regenerate_threshold() -> u8 {
    7
}
fn default_reject_threshold() -> u8 {
    5
}
fn default_similarity_threshold() -> u8 {
    7
}
fn default_sentence_tolerance() -> f32 {
    6.0
}
fn default_learning_rate() -> f64 {
    0.2
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            fingerprint_ttl_hours: default_ttl_hours(),
            exemplar_limit: default_exemplar_limit(),
            generation_exemplars: default_generation_exemplars(),
            generation_temperature: default_generation_temperature(),
            extraction_temperature: default_extraction_temperature(),
            regenerate_threshold: default_regenerate_threshold(),
            reject_threshold: default_reject_threshold(),
            similarity_threshold: default_similarity_threshold(),
            sentence_length_tolerance: default_sentence_tolerance(),
            pattern_learning_rate: default_learning_rate(),
            lexicon: LexiconConfig::default(),
        }
    }
}

/// A phrase and its plain-language replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl Substitution {
    fn pair(from: &str, to: &str) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

/// Word lists used by post-processing, validation and the knowledge map.
///
/// The defaults are English and hand-curated; deployments in other
/// languages or domains replace them here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Corporate vocabulary rewritten during post-processing
    #[serde(default = "default_corporate_substitutions")]
    pub corporate_substitutions: Vec<Substitution>,

    /// Corporate vocabulary that hard-rejects a text (whole-word match)
    #[serde(default = "default_corporate_denylist")]
    pub corporate_denylist: Vec<String>,

    /// Hedging phrases penalised by the validator, with the direct alternative
    #[serde(default = "default_softened_phrases")]
    pub softened_phrases: Vec<Substitution>,

    /// Words a failure story is expected to contain
    #[serde(default = "default_failure_vocabulary")]
    pub failure_vocabulary: Vec<String>,

    /// Words in the angle that mark a failure story
    #[serde(default = "default_failure_markers")]
    pub failure_angle_markers: Vec<String>,

    /// Spelled-out numbers that count as concrete
    #[serde(default = "default_number_words")]
    pub number_words: Vec<String>,

    /// Tool and product names recognised by the knowledge map
    #[serde(default = "default_known_tools")]
    pub known_tools: Vec<String>,
}

fn default_corporate_substitutions() -> Vec<Substitution> {
    vec![
        Substitution::pair("in order to", "to"),
        Substitution::pair("utilize", "use"),
        Substitution::pair("utilise", "use"),
        Substitution::pair("leverage", "use"),
        Substitution::pair("facilitate", "help"),
        Substitution::pair("circle back", "come back"),
        Substitution::pair("reach out", "get in touch"),
        Substitution::pair("moving forward", "from now on"),
        Substitution::pair("going forward", "from now on"),
        Substitution::pair("at the end of the day", "in the end"),
        Substitution::pair("bandwidth", "time"),
        Substitution::pair("action items", "next steps"),
    ]
}

fn default_corporate_denylist() -> Vec<String> {
    [
        "delve",
        "tapestry",
        "game-changer",
        "paradigm",
        "synergy",
        "synergize",
        "holistic",
        "seamless",
        "seamlessly",
        "cutting-edge",
        "revolutionize",
        "empower",
        "unlock",
        "elevate",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_softened_phrases() -> Vec<Substitution> {
    vec![
        Substitution::pair("i think maybe", "i think"),
        Substitution::pair("it might be worth", "it's worth"),
        Substitution::pair("perhaps", "(say it plainly)"),
        Substitution::pair("somewhat", "(drop it)"),
        Substitution::pair("kind of", "(drop it)"),
        Substitution::pair("sort of", "(drop it)"),
        Substitution::pair("just wanted to", "(start with the point)"),
        Substitution::pair("i feel like", "i think"),
        Substitution::pair("arguably", "(commit to the claim)"),
    ]
}

fn default_failure_vocabulary() -> Vec<String> {
    [
        "failed", "failure", "broke", "broken", "mistake", "wrong", "lost", "crashed",
        "messed up", "screwed up", "bug", "outage", "flopped", "missed",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_failure_markers() -> Vec<String> {
    [
        "fail", "mistake", "lesson", "postmortem", "post-mortem", "went wrong", "lost",
        "regret", "flop", "setback",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_number_words() -> Vec<String> {
    [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "twelve", "twenty", "hundred", "thousand", "million", "dozen", "half",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_known_tools() -> Vec<String> {
    [
        "Rust", "Python", "TypeScript", "Go", "Notion", "Figma", "Slack", "GitHub", "Linear",
        "Stripe", "React", "Postgres", "Kubernetes", "Docker", "Excel", "Salesforce",
        "HubSpot", "Airtable", "Zapier", "Webflow", "Shopify",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            corporate_substitutions: default_corporate_substitutions(),
            corporate_denylist: default_corporate_denylist(),
            softened_phrases: default_softened_phrases(),
            failure_vocabulary: default_failure_vocabulary(),
            failure_angle_markers: default_failure_markers(),
            number_words: default_number_words(),
            known_tools: default_known_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Characters per estimated token
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// A batch summary is written every this many turns
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Deep compaction starts at this many tokens
    #[serde(default = "default_deep_threshold")]
    pub deep_threshold: usize,

    /// Hard context ceiling of the model
    #[serde(default = "default_token_ceiling")]
    pub token_ceiling: usize,

    /// Raw turns folded into a deep compaction alongside the summaries
    #[serde(default = "default_deep_window")]
    pub deep_recent_window: usize,
}

fn default_chars_per_token() -> usize {
    4
}
fn default_batch_size() -> usize {
    10
}
fn default_deep_threshold() -> usize {
    180_000
}
fn default_token_ceiling() -> usize {
    200_000
}
fn default_deep_window() -> usize {
    20
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            chars_per_token: default_chars_per_token(),
            batch_size: default_batch_size(),
            deep_threshold: default_deep_threshold(),
            token_ceiling: default_token_ceiling(),
            deep_recent_window: default_deep_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Per-attempt timeout for upstream model calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt, for transient failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles per retry
    #[serde(default = "default_backoff_ms")]
    pub base_backoff_ms: u64,
}

fn default_request_timeout() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    500
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// SQLite database file; defaults to ~/.voiceprint/voiceprint.db
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
        }
    }
}

impl StorageConfig {
    /// Resolved SQLite path.
    pub fn database_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("voiceprint.db"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.voiceprint/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `VOICEPRINT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("VOICEPRINT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("VOICEPRINT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("VOICEPRINT_MODEL") {
            self.default_model = model;
        }

        if let Ok(db) = std::env::var("VOICEPRINT_DB") {
            self.storage.path = Some(db);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".voiceprint")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, t) in [
            ("default_temperature", self.default_temperature),
            ("voice.generation_temperature", self.voice.generation_temperature),
            ("voice.extraction_temperature", self.voice.extraction_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        let voice = &self.voice;
        if voice.regenerate_threshold > 10 || voice.similarity_threshold > 10 {
            return Err(ConfigError::ValidationError(
                "validation thresholds are scores out of 10".into(),
            ));
        }
        if voice.reject_threshold > voice.regenerate_threshold {
            return Err(ConfigError::ValidationError(
                "voice.reject_threshold must not exceed voice.regenerate_threshold".into(),
            ));
        }
        if !(0.0..=1.0).contains(&voice.pattern_learning_rate) {
            return Err(ConfigError::ValidationError(
                "voice.pattern_learning_rate must be between 0.0 and 1.0".into(),
            ));
        }

        let ctx = &self.context;
        if ctx.batch_size == 0 || ctx.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "context.batch_size and context.chars_per_token must be > 0".into(),
            ));
        }
        if ctx.deep_threshold >= ctx.token_ceiling {
            return Err(ConfigError::ValidationError(
                "context.deep_threshold must sit below context.token_ceiling".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be > 0".into(),
            ));
        }

        if !matches!(self.storage.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown storage backend '{}'",
                self.storage.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fingerprint TTL as a chrono duration.
    pub fn fingerprint_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.voice.fingerprint_ttl_hours))
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            agent: AgentConfig::default(),
            voice: VoiceConfig::default(),
            context: ContextConfig::default(),
            reliability: ReliabilityConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_iterations, 8);
        assert_eq!(config.context.batch_size, 10);
        assert_eq!(config.context.deep_threshold, 180_000);
        assert_eq!(config.voice.regenerate_threshold, 7);
        assert_eq!(config.voice.reject_threshold, 5);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(
            parsed.voice.lexicon.corporate_denylist,
            config.voice.lexicon.corporate_denylist
        );
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.voice.generation_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.voice.reject_threshold = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn deep_threshold_must_leave_headroom() {
        let mut config = AppConfig::default();
        config.context.deep_threshold = config.context.token_ceiling;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "openrouter");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
default_model = "local/llama"

[voice]
regenerate_threshold = 8

[voice.lexicon]
corporate_denylist = ["incroyable"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "local/llama");
        assert_eq!(config.voice.regenerate_threshold, 8);
        assert_eq!(config.voice.reject_threshold, 5);
        assert_eq!(config.voice.lexicon.corporate_denylist, vec!["incroyable"]);
        assert!(!config.voice.lexicon.softened_phrases.is_empty());
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("corporate_denylist"));
    }
}
