//! Web research client: search queries and page scraping.
//!
//! Both operations are best-effort. Every call is bounded by a timeout and a
//! transient failure is retried once after a short backoff; anything still
//! failing is logged and absorbed, so a bad URL or a flaky search call costs
//! coverage rather than the whole run.

mod error;
mod fetch;
mod tavily;

pub use error::NetworkError;
pub use fetch::{html_to_text, HttpFetcher};
pub use tavily::TavilyClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    SearchConfig, DEFAULT_MAX_PAGE_CHARS, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_WEB_TIMEOUT_SECS,
};

/// One hit returned by the search service, in relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Text fetched from one URL. Empty content means the fetch failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedDocument {
    pub url: String,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

impl ScrapedDocument {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Placeholder for a URL that could not be fetched.
    pub fn empty(url: impl Into<String>) -> Self {
        Self::new(url, String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// An external search service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns up to `max_results` hits, best first.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, NetworkError>;

    /// Provider name, for logs.
    fn name(&self) -> &str;
}

/// Fetches the readable text of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, NetworkError>;
}

/// Search + scrape with timeouts, one retry and domain filtering.
pub struct WebResearchClient {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    timeout: Duration,
    retry_backoff: Duration,
    excluded_domains: Vec<String>,
    max_page_chars: usize,
}

impl WebResearchClient {
    pub fn new(search: Arc<dyn SearchProvider>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            search,
            fetcher,
            timeout: Duration::from_secs(DEFAULT_WEB_TIMEOUT_SECS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            excluded_domains: Vec::new(),
            max_page_chars: DEFAULT_MAX_PAGE_CHARS,
        }
    }

    /// Builds the Tavily + HTTP client pair described by `config`.
    pub fn from_config(config: &SearchConfig) -> Result<Self, NetworkError> {
        let search: Arc<dyn SearchProvider> = match config.provider.as_str() {
            "tavily" => {
                let key = config.api_key.clone().ok_or(NetworkError::MissingApiKey)?;
                Arc::new(
                    TavilyClient::new(key)
                        .with_base_url(&config.base_url)
                        .with_search_depth(&config.search_depth)
                        .with_timeout(config.timeout())?,
                )
            }
            other => return Err(NetworkError::UnknownProvider(other.to_string())),
        };
        let fetcher = Arc::new(HttpFetcher::new(&config.user_agent, Some(config.timeout()))?);

        Ok(Self::new(search, fetcher)
            .with_timeout(config.timeout())
            .with_retry_backoff(config.retry_backoff())
            .with_excluded_domains(config.excluded_domains.clone())
            .with_max_page_chars(config.max_page_chars))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_excluded_domains(mut self, domains: Vec<String>) -> Self {
        self.excluded_domains = domains
            .into_iter()
            .map(|d| d.trim().trim_start_matches("www.").to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    pub fn with_max_page_chars(mut self, max_chars: usize) -> Self {
        self.max_page_chars = max_chars;
        self
    }

    /// Runs one search. Failures yield an empty list.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        if top_k == 0 {
            return Vec::new();
        }

        match self.attempt(|| self.search.search(query, top_k)).await {
            Ok(results) => {
                let found = results.len();
                let kept: Vec<SearchResult> = results
                    .into_iter()
                    .filter(|r| self.is_allowed(&r.url))
                    .take(top_k)
                    .collect();
                tracing::debug!(
                    provider = self.search.name(),
                    query,
                    found,
                    kept = kept.len(),
                    "search finished"
                );
                kept
            }
            Err(e) => {
                tracing::warn!(provider = self.search.name(), query, error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Fetches one page. Failures yield a document with empty content.
    pub async fn scrape(&self, url: &str) -> ScrapedDocument {
        match self.attempt(|| self.fetcher.fetch(url)).await {
            Ok(text) => {
                let content = truncate_chars(text.trim(), self.max_page_chars);
                tracing::debug!(url, chars = content.chars().count(), "scraped page");
                ScrapedDocument::new(url, content)
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "scrape failed");
                ScrapedDocument::empty(url)
            }
        }
    }

    /// Whether `url` is an http(s) URL outside the excluded domains.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        !self
            .excluded_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }

    /// One timed call, plus one retry after `retry_backoff` when the failure is transient.
    async fn attempt<T, F, Fut>(&self, mut call: F) -> Result<T, NetworkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        match self.timed(call()).await {
            Err(e) if e.is_transient() => {
                tracing::debug!(error = %e, backoff = ?self.retry_backoff, "retrying after transient failure");
                tokio::time::sleep(self.retry_backoff).await;
                self.timed(call()).await
            }
            other => other,
        }
    }

    async fn timed<T>(
        &self,
        fut: impl Future<Output = Result<T, NetworkError>>,
    ) -> Result<T, NetworkError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or(Err(NetworkError::Timeout(self.timeout)))
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
