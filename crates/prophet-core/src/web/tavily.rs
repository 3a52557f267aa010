use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{NetworkError, SearchProvider, SearchResult};
use crate::config::{DEFAULT_SEARCH_DEPTH, DEFAULT_TAVILY_URL};

/// Tavily search API client.
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    search_depth: String,
    client: Client,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_TAVILY_URL.to_string(),
            search_depth: DEFAULT_SEARCH_DEPTH.to_string(),
            client: Client::new(),
        }
    }

    /// Sets the API URL (for proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// "basic" or "advanced".
    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, NetworkError> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, NetworkError> {
        let url = format!("{}/search", self.base_url);
        let request = TavilyRequest {
            query,
            max_results,
            search_depth: &self.search_depth,
            include_answer: false,
        };

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(NetworkError::RateLimited("tavily".to_string()));
        }
        if !status.is_success() {
            return Err(NetworkError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| NetworkError::Parse(e.to_string()))?;

        Ok(body.into_results(max_results))
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl TavilyResponse {
    fn into_results(self, max_results: usize) -> Vec<SearchResult> {
        self.results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(max_results)
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                snippet: r.content,
            })
            .collect()
    }
}
