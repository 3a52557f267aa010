use std::sync::Arc;
use std::time::Duration;

use super::{ClaudeClient, LLMError, OpenAIClient, LLM};
use crate::config::{
    LLMConfig, DEFAULT_ANTHROPIC_MODEL, DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_MAX_TOKENS,
    DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL, DEFAULT_OPENROUTER_URL,
    DEFAULT_TEMPERATURE,
};

/// LLM Provider configuration.
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI-compatible endpoint (default, most universal)
    OpenAI {
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    },
    /// Anthropic Claude
    Anthropic {
        api_url: Option<String>,
        api_key: Option<String>,
        api_version: Option<String>,
        model: Option<String>,
    },
    /// Local Ollama instance
    Ollama {
        base_url: Option<String>,
        model: String,
    },
}

/// Request settings shared by every provider.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl RequestOptions {
    pub fn from_config(config: &LLMConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }
}

impl Provider {
    /// Creates a provider from LLMConfig.
    pub fn from_config(config: &LLMConfig) -> Result<Self, LLMError> {
        let provider = match config.provider.as_str() {
            "anthropic" | "claude" => Provider::Anthropic {
                api_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                api_version: config.api_version.clone(),
                model: config.model.clone(),
            },
            "ollama" => Provider::Ollama {
                base_url: config.base_url.clone(),
                model: config.model_or_default(),
            },
            "openrouter" => Provider::OpenAI {
                base_url: Some(
                    config
                        .base_url
                        .clone()
                        .unwrap_or_else(|| DEFAULT_OPENROUTER_URL.to_string()),
                ),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
            },
            "openai" | "openai-compatible" => Provider::OpenAI {
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
            },
            other => return Err(LLMError::UnknownProvider(other.to_string())),
        };
        Ok(provider)
    }

    /// Creates an LLM client from the provider configuration.
    pub fn build(self, options: RequestOptions) -> Result<Box<dyn LLM>, LLMError> {
        match self {
            Provider::OpenAI { base_url, api_key, model } => {
                let base = base_url.unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
                let key = api_key.unwrap_or_default();
                let mdl = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

                Ok(Box::new(
                    OpenAIClient::new(base, key, mdl)
                        .with_max_tokens(options.max_tokens)
                        .with_temperature(options.temperature)
                        .with_timeout(options.timeout)?,
                ))
            }

            Provider::Anthropic {
                api_url,
                api_key,
                api_version,
                model,
            } => {
                let key = api_key.ok_or(LLMError::MissingApiKey)?;
                let mdl = model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());

                let mut client = ClaudeClient::new(key)
                    .with_model(mdl)
                    .with_max_tokens(options.max_tokens)
                    .with_temperature(options.temperature)
                    .with_timeout(options.timeout)?;
                if let Some(url) = api_url {
                    client = client.with_api_url(url);
                }
                if let Some(version) = api_version {
                    client = client.with_api_version(version);
                }
                Ok(Box::new(client))
            }

            Provider::Ollama { base_url, model } => {
                let base = base_url
                    .map(|h| {
                        let h = h.trim_end_matches('/');
                        if h.ends_with("/v1") {
                            h.to_string()
                        } else {
                            format!("{}/v1", h)
                        }
                    })
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

                Ok(Box::new(
                    OpenAIClient::new(base, "", model)
                        .with_max_tokens(options.max_tokens)
                        .with_temperature(options.temperature)
                        .with_timeout(options.timeout)?,
                ))
            }
        }
    }
}

/// Builds a shareable client for `config`.
pub fn client_from_config(config: &LLMConfig) -> Result<Arc<dyn LLM>, LLMError> {
    let client = Provider::from_config(config)?.build(RequestOptions::from_config(config))?;
    Ok(Arc::from(client))
}
