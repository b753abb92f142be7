//! Error types for embedding and indexing

/// Failure of an embedding backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Backend cannot be reached or refused the request
    #[error("embedding backend '{backend}' unavailable: {reason}")]
    Unavailable {
        /// Backend name
        backend: String,
        /// Underlying cause
        reason: String,
    },

    /// Backend answered with something other than a vector
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    /// Vector length differs from the configured dimensionality
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        /// Configured dimensionality
        expected: usize,
        /// Length actually produced
        actual: usize,
    },
}

impl EmbeddingError {
    /// Whether the backend itself could not be reached
    #[inline]
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Index and document store errors
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Embedding the document or query failed
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// SQLite operation failed
    #[error("document store error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Stored embedding could not be encoded or decoded
    #[error("embedding serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored timestamp is not RFC 3339
    #[error("invalid timestamp for '{path}': {value}")]
    InvalidTimestamp {
        /// Record path
        path: String,
        /// Raw stored value
        value: String,
    },
}
