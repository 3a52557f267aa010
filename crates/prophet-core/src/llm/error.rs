use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("Missing API key. Set llm.api_key or the provider's API key environment variable.")]
    MissingApiKey,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited. Try again later.")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else {
            LLMError::Network(err.to_string())
        }
    }
}

/// A model call that failed or whose output did not match the expected schema.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("LLM call failed: {0}")]
    Call(#[from] LLMError),

    #[error("Unparseable model response ({reason}). Response: {excerpt}")]
    Unparseable { reason: String, excerpt: String },

    #[error("Model response violates schema: {0}")]
    Schema(String),
}
