//! Incident Triage Embedding Index
//!
//! Cosine-similarity search over embedded playbook documents.
//!
//! # Overview
//!
//! - **Embedder**: text to fixed-length vector contract, plus the offline
//!   [`HashingEmbedder`]
//! - **EmbeddingIndex**: exhaustive linear-scan index keyed by path
//! - **SqliteDocumentStore**: optional write-through persistence
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use triage_index::{EmbeddingIndex, HashingEmbedder};
//! use triage_model::{Category, DocumentRecord};
//!
//! let index = EmbeddingIndex::new(Arc::new(HashingEmbedder::new(2)));
//! let near = DocumentRecord::new("db.md", "DB pool", "...", Category::Database, vec![1.0, 0.1]);
//! let far = DocumentRecord::new("tls.md", "TLS", "...", Category::Security, vec![0.0, 1.0]);
//! index.upsert_record(near).unwrap();
//! index.upsert_record(far).unwrap();
//!
//! let hits = index.search_vector(&[1.0, 0.0], 1, None);
//! assert_eq!(hits[0].document.path, "db.md");
//! ```

#![warn(missing_docs)]

pub mod embedder;
pub mod error;
pub mod index;
pub mod similarity;
pub mod store;

// Re-exports
pub use embedder::{check_dimensions, Embedder, HashingEmbedder};
pub use error::{EmbeddingError, IndexError};
pub use index::{EmbeddingIndex, NewDocument};
pub use similarity::{cosine_similarity, l2_normalize};
pub use store::{DocumentStore, SqliteDocumentStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for index operations
    pub use crate::{
        Embedder, EmbeddingError, EmbeddingIndex, HashingEmbedder, IndexError, NewDocument,
        SqliteDocumentStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
