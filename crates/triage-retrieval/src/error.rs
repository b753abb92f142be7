//! Error types for corpus loading and retrieval

use std::path::PathBuf;
use triage_index::IndexError;

/// Retrieval failures that are not degradations
///
/// A missing corpus directory or an unreadable single document is logged
/// and skipped rather than reported here.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Index operation failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Corpus directory exists but cannot be listed
    #[error("io error listing {path}: {source}")]
    Io {
        /// Directory being listed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl RetrievalError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
