use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{
    ChunkId, Embedder, EmbeddingError, EvidenceChunk, ScoredChunk, SplitterConfig, TextSplitter,
};
use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_EMBEDDING_BATCH_SIZE};
use crate::web::ScrapedDocument;

/// In-memory vector store for one research run.
///
/// Uses brute-force cosine similarity, which is plenty for the few thousand
/// chunks a single question produces. A store is never shared between runs.
pub struct EvidenceStore {
    embedder: Arc<dyn Embedder>,
    chunks: Vec<EvidenceChunk>,
    ids: HashSet<ChunkId>,
    dimension: Option<usize>,
    batch_size: usize,
    concurrency: usize,
}

/// What happened during one [`EvidenceStore::add`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Documents with content that were split.
    pub documents: usize,
    /// Documents skipped because their content was empty.
    pub empty_documents: usize,
    /// Chunks embedded and stored.
    pub chunks_added: usize,
    /// Chunks dropped because embedding failed or produced a bad vector.
    pub chunks_failed: usize,
    /// Chunks already present (same source and text).
    pub duplicates: usize,
}

struct PendingChunk {
    id: ChunkId,
    source_url: String,
    text: String,
}

impl EvidenceStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunks: Vec::new(),
            ids: HashSet::new(),
            dimension: None,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Chunks per embedding call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embedding calls in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality fixed by the first stored vector.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Splits `documents` into chunks, embeds them and stores the result.
    ///
    /// Never fails as a whole: a chunk whose embedding fails is logged and
    /// skipped, and a failed batch is retried one chunk at a time so a single
    /// bad input only costs itself.
    pub async fn add(&mut self, documents: &[ScrapedDocument], splitter: &SplitterConfig) -> IngestStats {
        let splitter = TextSplitter::new(splitter);
        let mut stats = IngestStats::default();
        let mut pending = Vec::new();
        let mut queued = HashSet::new();

        for doc in documents {
            if doc.is_empty() {
                stats.empty_documents += 1;
                continue;
            }
            stats.documents += 1;

            for text in splitter.split(&doc.content) {
                let id = ChunkId::for_text(&doc.url, &text);
                if self.ids.contains(&id) || !queued.insert(id.clone()) {
                    stats.duplicates += 1;
                    continue;
                }
                pending.push(PendingChunk {
                    id,
                    source_url: doc.url.clone(),
                    text,
                });
            }
        }

        let vectors: Vec<Option<Vec<f32>>> = stream::iter(pending.chunks(self.batch_size))
            .map(|batch| self.embed_batch(batch))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        for (chunk, vector) in pending.into_iter().zip(vectors) {
            let accepted = vector
                .ok_or_else(|| EmbeddingError::Failed("no vector returned".to_string()))
                .and_then(|v| self.check_vector(v));

            match accepted {
                Ok(embedding) => {
                    self.ids.insert(chunk.id.clone());
                    self.chunks.push(EvidenceChunk::new(
                        chunk.id,
                        chunk.source_url,
                        chunk.text,
                        embedding,
                    ));
                    stats.chunks_added += 1;
                }
                Err(e) => {
                    tracing::warn!(chunk = %chunk.id, source = %chunk.source_url, error = %e, "skipping chunk");
                    stats.chunks_failed += 1;
                }
            }
        }

        tracing::info!(
            documents = stats.documents,
            chunks = stats.chunks_added,
            failed = stats.chunks_failed,
            duplicates = stats.duplicates,
            model = self.embedder.model_name(),
            "evidence ingested"
        );

        stats
    }

    /// Returns at most `top_k` chunks, most similar to `text` first.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        if top_k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embed_query(text).await?;

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(&query, chunk.embedding()),
                chunk: chunk.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut seen = HashSet::new();
        Ok(scored
            .into_iter()
            .filter(|s| seen.insert(s.chunk.id().clone()))
            .take(top_k)
            .collect())
    }

    /// Queries with every text in `queries` and merges the hits by chunk
    /// identity, keeping each chunk's best score. Returns the global top `top_k`.
    ///
    /// A query whose embedding fails is logged and ignored.
    pub async fn query_merged(&self, queries: &[&str], top_k: usize) -> Vec<ScoredChunk> {
        let mut best: HashMap<ChunkId, ScoredChunk> = HashMap::new();

        for query in queries {
            match self.query(query, top_k).await {
                Ok(hits) => {
                    for hit in hits {
                        match best.get(hit.chunk.id()) {
                            Some(existing) if existing.score >= hit.score => {}
                            _ => {
                                best.insert(hit.chunk.id().clone(), hit);
                            }
                        }
                    }
                }
                Err(e) => tracing::warn!(query, error = %e, "evidence query failed"),
            }
        }

        let mut merged: Vec<ScoredChunk> = best.into_values().collect();
        merged.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id().cmp(b.chunk.id()))
        });
        merged.truncate(top_k);
        merged
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embedder.embed(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::Failed(format!(
                "expected 1 query embedding, got {}",
                vectors.len()
            )));
        }
        let vector = vectors.remove(0);
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        Ok(vector)
    }

    async fn embed_batch(&self, batch: &[PendingChunk]) -> Vec<Option<Vec<f32>>> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

        match self.embedder.embed(&texts).await {
            Ok(vectors) if vectors.len() == texts.len() => vectors.into_iter().map(Some).collect(),
            Ok(vectors) => {
                tracing::warn!(
                    expected = texts.len(),
                    got = vectors.len(),
                    "embedding batch size mismatch, embedding chunks one by one"
                );
                self.embed_each(batch).await
            }
            Err(e) if batch.len() > 1 => {
                tracing::warn!(error = %e, size = batch.len(), "embedding batch failed, embedding chunks one by one");
                self.embed_each(batch).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed");
                vec![None]
            }
        }
    }

    async fn embed_each(&self, batch: &[PendingChunk]) -> Vec<Option<Vec<f32>>> {
        let mut out = Vec::with_capacity(batch.len());
        for chunk in batch {
            let vector = match self.embedder.embed(&[chunk.text.clone()]).await {
                Ok(mut vectors) if vectors.len() == 1 => Some(vectors.remove(0)),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(chunk = %chunk.id, error = %e, "chunk embedding failed");
                    None
                }
            };
            out.push(vector);
        }
        out
    }

    /// Enforces one dimensionality per store and rejects NaN/empty vectors.
    fn check_vector(&mut self, vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
        if vector.is_empty() {
            return Err(EmbeddingError::Malformed("empty vector".to_string()));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::Malformed("non-finite component".to_string()));
        }
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            Some(_) => Ok(vector),
            None => {
                self.dimension = Some(vector.len());
                Ok(vector)
            }
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction, and 0 when
/// either vector has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
