use std::time::Duration;
use thiserror::Error;

/// Failures talking to the search service or a scraped site.
///
/// These never escape the web research client: a failed search becomes an
/// empty result list and a failed scrape an empty document.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Missing search API key")]
    MissingApiKey,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Unsupported content type {content_type} at {url}")]
    UnsupportedContent { url: String, content_type: String },

    #[error("Unknown search provider: {0}")]
    UnknownProvider(String),
}

impl NetworkError {
    /// Whether a second attempt has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Timeout(_) | NetworkError::Request(_) | NetworkError::RateLimited(_) => {
                true
            }
            NetworkError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Request(format!("timeout: {}", err))
        } else {
            NetworkError::Request(err.to_string())
        }
    }
}
