//! Embedding generation for evidence retrieval.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingError;
use crate::config::{EmbeddingConfig, DEFAULT_OPENAI_EMBEDDING_MODEL, DEFAULT_OPENAI_URL};

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for a batch of text, one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// FastEmbed-based embedder using BGE-Small model.
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
    model_name: String,
}

impl FastEmbedder {
    /// Create a new FastEmbed embedder with the default model.
    /// Uses `~/.prophet/cache/` as the model cache directory.
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_model_and_cache(EmbeddingModel::BGESmallENV15, Self::default_cache_dir())
    }

    /// Create a new FastEmbed embedder with a specific model and cache directory.
    pub fn with_model_and_cache(
        model: EmbeddingModel,
        cache_dir: PathBuf,
    ) -> Result<Self, EmbeddingError> {
        let model_name = format!("{:?}", model);

        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            EmbeddingError::Init(format!("Failed to create cache directory: {}", e))
        })?;

        let text_embedding = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbeddingError::Init(e.to_string()))?;

        Ok(Self {
            model: Arc::new(text_embedding),
            model_name,
        })
    }

    /// Get the default cache directory: `~/.prophet/cache/`
    fn default_cache_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prophet")
            .join("cache")
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // ONNX inference is CPU-bound
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| EmbeddingError::Failed(e.to_string()))?
            .map_err(|e| EmbeddingError::Failed(e.to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Client for any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbedder {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAIEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, EmbeddingError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Init(format!("failed to build HTTP client: {}", e)))?;
        Ok(self)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut req = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });
        if !self.api_key.is_empty() {
            req = req.header("authorization", format!("Bearer {}", self.api_key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| EmbeddingError::Failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Failed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Failed(e.to_string()))?;

        body.into_vectors(texts.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Vectors in input order; the API does not promise to return them sorted.
    fn into_vectors(mut self, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.data.len() != expected {
            return Err(EmbeddingError::Failed(format!(
                "expected {} embeddings, got {}",
                expected,
                self.data.len()
            )));
        }
        self.data.sort_by_key(|d| d.index);
        Ok(self.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Builds the embedder described by `config`.
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "fastembed" => Ok(Arc::new(FastEmbedder::new()?)),
        "openai" => {
            let base = config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_EMBEDDING_MODEL.to_string());
            let key = config.api_key.clone().unwrap_or_default();
            Ok(Arc::new(
                OpenAIEmbedder::new(base, key, model)
                    .with_timeout(Duration::from_secs(config.timeout_secs))?,
            ))
        }
        other => Err(EmbeddingError::Init(format!("unknown embedding provider: {}", other))),
    }
}
