mod claude;
mod error;
mod openai;
pub mod parse;
mod provider;

pub use claude::ClaudeClient;
pub use error::{InferenceError, LLMError};
pub use openai::OpenAIClient;
pub use provider::{client_from_config, Provider, RequestOptions};

use async_trait::async_trait;

/// Trait for Large Language Model providers.
///
/// Every stage of the pipeline talks to the model through this trait, so
/// providers can be swapped (or faked in tests) without touching the stages.
///
/// # Supported Providers
///
/// - **OpenAI-compatible** (default): OpenAI, Azure, Ollama, vLLM, OpenRouter, etc.
/// - **Anthropic**: Claude models via Anthropic API
/// - **Ollama**: Local models via Ollama
///
/// # Example
///
/// ```ignore
/// use prophet_core::llm::{client_from_config, LLM};
///
/// let llm = client_from_config(&config.llm)?;
/// let response = llm.complete_with_system("You are terse.", "Hello!").await?;
/// ```
#[async_trait]
pub trait LLM: Send + Sync {
    /// Complete a prompt with a system message.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}
