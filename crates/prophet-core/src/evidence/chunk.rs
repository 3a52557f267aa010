//! Evidence chunk with embedding for retrieval.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identity of a chunk: a digest of its source URL and text.
///
/// The same window of the same page always gets the same id, which is what
/// deduplication across sub-queries and repeated URLs keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn for_text(source_url: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_url.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A window of scraped text with its embedding vector. Immutable.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceChunk {
    id: ChunkId,
    text: String,
    source_url: String,
    #[serde(skip)]
    embedding: Vec<f32>,
}

impl EvidenceChunk {
    pub(crate) fn new(id: ChunkId, source_url: String, text: String, embedding: Vec<f32>) -> Self {
        Self {
            id,
            text,
            source_url,
            embedding,
        }
    }

    pub fn id(&self) -> &ChunkId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// A chunk returned by a query, with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: EvidenceChunk,
    /// Cosine similarity in [-1, 1]; higher is closer.
    pub score: f32,
}
