//! Configuration management for Prophet.
//!
//! The first file found is loaded, otherwise the built-in defaults:
//! 1. Project-local `prophet.toml` file
//! 2. User config `~/.config/prophet/config.toml`
//! 3. Built-in defaults
//!
//! `PROPHET_*` environment variables then override the loaded values. API keys
//! are the exception: `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `TAVILY_API_KEY`
//! and the `PROPHET_*_API_KEY` variables only fill keys the file leaves unset.
//!
//! The environment is read once, at load time. Components receive the
//! resolved values through their constructors and never consult it again.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

use crate::evidence::SplitterConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration.
    pub llm: LLMConfig,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Web search and scraping configuration.
    pub search: SearchConfig,

    /// Research orchestration configuration.
    pub research: ResearchConfig,

    /// Prediction stage configuration.
    pub prediction: StageConfig,

    /// Grading stage configuration.
    pub grading: StageConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./prophet.toml` (project local)
    /// 2. `~/.config/prophet/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("prophet.toml").exists() {
            return Self::from_file("prophet.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("prophet").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from the process environment.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Split out from [`Config::apply_env_overrides`] so the override rules can
    /// be exercised without touching the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // LLM overrides
        if let Some(provider) = lookup("PROPHET_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("PROPHET_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = lookup("PROPHET_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(key) = lookup("PROPHET_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(n) = lookup("PROPHET_LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = n;
        }
        if self.llm.api_key.is_none() {
            let fallback = match self.llm.provider.as_str() {
                "anthropic" | "claude" => "ANTHROPIC_API_KEY",
                "openrouter" => "OPENROUTER_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            self.llm.api_key = lookup(fallback);
        }

        // Embedding overrides
        if let Some(provider) = lookup("PROPHET_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = lookup("PROPHET_EMBEDDING_MODEL") {
            self.embedding.model = Some(model);
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key =
                lookup("PROPHET_EMBEDDING_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        // Search overrides
        if self.search.api_key.is_none() {
            self.search.api_key =
                lookup("PROPHET_SEARCH_API_KEY").or_else(|| lookup("TAVILY_API_KEY"));
        }

        // Research overrides
        if let Some(n) = lookup("PROPHET_SUBQUERIES_LIMIT").and_then(|v| v.parse().ok()) {
            self.research.subqueries_limit = n;
        }
        if let Some(flag) = lookup("PROPHET_USE_SUMMARIES").and_then(|v| v.parse().ok()) {
            self.research.use_summaries = flag;
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let research = &self.research;
        if research.subqueries_limit == 0 {
            return Err(ConfigError::Invalid(
                "research.subqueries_limit must be at least 1".to_string(),
            ));
        }
        if research.top_k == 0 {
            return Err(ConfigError::Invalid("research.top_k must be at least 1".to_string()));
        }
        if research.chunk_size == 0 || research.chunk_overlap >= research.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "research.chunk_overlap ({}) must be smaller than research.chunk_size ({})",
                research.chunk_overlap, research.chunk_size
            )));
        }
        check_temperature("llm.temperature", Some(self.llm.temperature))?;
        check_temperature("prediction.temperature", self.prediction.temperature)?;
        check_temperature("grading.temperature", self.grading.temperature)?;
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn check_temperature(name: &str, temperature: Option<f32>) -> Result<(), ConfigError> {
    match temperature {
        Some(t) if !(0.0..=2.0).contains(&t) => Err(ConfigError::Invalid(format!(
            "{} must be within [0, 2], got {}",
            name, t
        ))),
        _ => Ok(()),
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Provider name: "openai", "anthropic", "ollama", "openrouter" or "openai-compatible".
    pub provider: String,

    /// Model name (provider-specific).
    pub model: Option<String>,

    /// Base URL for the API (Anthropic takes the full messages endpoint).
    pub base_url: Option<String>,

    /// API key (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum tokens for response.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// API version (for Anthropic).
    pub api_version: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            api_version: Some(DEFAULT_ANTHROPIC_API_VERSION.to_string()),
        }
    }
}

impl LLMConfig {
    /// Get the model name, falling back to provider defaults.
    pub fn model_or_default(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider.as_str() {
            "anthropic" | "claude" => DEFAULT_ANTHROPIC_MODEL.to_string(),
            "ollama" => DEFAULT_OLLAMA_MODEL.to_string(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        })
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// A copy of this config with the stage's model and temperature applied.
    pub fn for_stage(&self, stage: &StageConfig) -> LLMConfig {
        let mut config = self.clone();
        if let Some(model) = &stage.model {
            config.model = Some(model.clone());
        }
        if let Some(temperature) = stage.temperature {
            config.temperature = temperature;
        }
        config
    }

    /// A copy of this config sampling at `temperature`.
    pub fn with_temperature(&self, temperature: f32) -> LLMConfig {
        LLMConfig {
            temperature,
            ..self.clone()
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "fastembed" (local BGE-small) or "openai" (any OpenAI-compatible `/embeddings`).
    pub provider: String,

    /// Model name for the "openai" provider.
    pub model: Option<String>,

    /// Base URL for the "openai" provider.
    pub base_url: Option<String>,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Chunks per embedding request.
    pub batch_size: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_EMBEDDING_PROVIDER.to_string(),
            model: None,
            base_url: None,
            api_key: None,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

/// Web search and scraping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search provider name. Only "tavily" is supported.
    pub provider: String,

    /// Search API base URL.
    pub base_url: String,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Tavily search depth: "basic" or "advanced".
    pub search_depth: String,

    /// Results from these domains (and their subdomains) are dropped.
    pub excluded_domains: Vec<String>,

    /// Timeout for one search or scrape call, in seconds.
    pub timeout_secs: u64,

    /// Pause before retrying a transient failure, in milliseconds.
    pub retry_backoff_ms: u64,

    /// Maximum characters kept from a scraped page.
    pub max_page_chars: usize,

    /// User agent for page fetches.
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_SEARCH_PROVIDER.to_string(),
            base_url: DEFAULT_TAVILY_URL.to_string(),
            api_key: None,
            search_depth: DEFAULT_SEARCH_DEPTH.to_string(),
            excluded_domains: DEFAULT_EXCLUDED_DOMAINS.iter().map(|s| s.to_string()).collect(),
            timeout_secs: DEFAULT_WEB_TIMEOUT_SECS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            max_page_chars: DEFAULT_MAX_PAGE_CHARS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Research orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Maximum sub-queries planned per question.
    pub subqueries_limit: usize,

    /// Search results scraped per sub-query.
    pub results_per_query: usize,

    /// Evidence chunks used for the report.
    pub top_k: usize,

    /// Chunk size in characters.
    pub chunk_size: usize,

    /// Chunk overlap in characters.
    pub chunk_overlap: usize,

    /// Concurrent search, scrape and embedding calls.
    pub concurrency: usize,

    /// Synthesize the report with the model (true) or hand over raw chunks (false).
    pub use_summaries: bool,

    /// Maximum length of model output quoted in error messages.
    pub error_context_length: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            subqueries_limit: DEFAULT_SUBQUERIES_LIMIT,
            results_per_query: DEFAULT_RESULTS_PER_QUERY,
            top_k: DEFAULT_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            concurrency: DEFAULT_CONCURRENCY,
            use_summaries: DEFAULT_USE_SUMMARIES,
            error_context_length: DEFAULT_ERROR_CONTEXT_LENGTH,
        }
    }
}

impl ResearchConfig {
    /// Splitter settings derived from the chunking fields.
    pub fn splitter(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Per-stage overrides for prediction and grading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Model used for this stage instead of `llm.model`.
    pub model: Option<String>,

    /// Sampling temperature used for this stage instead of `llm.temperature`.
    pub temperature: Option<f32>,
}

impl StageConfig {
    /// Whether this stage needs a client of its own.
    pub fn overrides_llm(&self) -> bool {
        self.model.is_some() || self.temperature.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, DEFAULT_LLM_PROVIDER);
        assert_eq!(config.research.subqueries_limit, DEFAULT_SUBQUERIES_LIMIT);
        assert_eq!(config.search.provider, DEFAULT_SEARCH_PROVIDER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[llm]"));
        assert!(toml_str.contains("[research]"));
        assert!(toml_str.contains("[search]"));
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_overrides_fill_keys_by_provider() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PROPHET_LLM_PROVIDER", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("TAVILY_API_KEY", "tvly"),
            ("PROPHET_USE_SUMMARIES", "false"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.search.api_key.as_deref(), Some("tvly"));
        assert!(!config.research.use_summaries);
    }

    #[test]
    fn test_file_key_wins_over_environment() {
        let mut config = Config::default();
        config.search.api_key = Some("from-file".to_string());
        config.apply_overrides(|k| (k == "TAVILY_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.search.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_environment_wins_over_file_settings() {
        let mut config = Config::default();
        config.llm.model = Some("from-file".to_string());
        config.research.subqueries_limit = 2;
        config.apply_overrides(|k| match k {
            "PROPHET_LLM_MODEL" => Some("from-env".to_string()),
            "PROPHET_SUBQUERIES_LIMIT" => Some("4".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.model.as_deref(), Some("from-env"));
        assert_eq!(config.research.subqueries_limit, 4);
    }

    #[test]
    fn test_validate_rejects_overlap_larger_than_chunk() {
        let mut config = Config::default();
        config.research.chunk_overlap = config.research.chunk_size;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_stage_overrides() {
        let config = LLMConfig {
            temperature: 0.7,
            ..LLMConfig::default()
        };
        let stage = StageConfig {
            model: Some("gpt-4-turbo".to_string()),
            temperature: Some(0.2),
        };
        let resolved = config.for_stage(&stage);
        assert_eq!(resolved.model_or_default(), "gpt-4-turbo");
        assert_eq!(resolved.temperature, 0.2);

        let untouched = config.for_stage(&StageConfig::default());
        assert_eq!(untouched.model_or_default(), DEFAULT_OPENAI_MODEL);
        assert_eq!(untouched.temperature, 0.7);
        assert!(!StageConfig::default().overrides_llm());
    }

    #[test]
    fn test_validate_rejects_stage_temperature() {
        let mut config = Config::default();
        config.prediction.temperature = Some(3.5);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
