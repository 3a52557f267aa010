use thiserror::Error;

/// Errors raised while embedding text.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedding backend could not be set up.
    #[error("Failed to initialize embedder: {0}")]
    Init(String),

    /// An embedding call failed.
    #[error("Embedding failed: {0}")]
    Failed(String),

    /// A vector did not match the dimensionality of the store.
    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector was empty or contained NaN/infinite values.
    #[error("Embedding is malformed: {0}")]
    Malformed(String),
}
