//! Evidence store: chunking, embedding and similarity retrieval over
//! scraped documents.
//!
//! A store lives for exactly one research run. Documents go in through
//! [`EvidenceStore::add`], which splits them with a [`TextSplitter`] and
//! embeds the chunks; [`EvidenceStore::query`] returns the chunks closest
//! to a piece of text by cosine similarity.

mod chunk;
mod embedder;
mod error;
mod splitter;
mod store;

pub use chunk::{ChunkId, EvidenceChunk, ScoredChunk};
pub use embedder::{embedder_from_config, Embedder, FastEmbedder, OpenAIEmbedder};
pub use error::EmbeddingError;
pub use splitter::{SplitterConfig, TextSplitter};
pub use store::{cosine_similarity, EvidenceStore, IngestStats};
