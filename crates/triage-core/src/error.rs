//! Error types for the triage pipeline
//!
//! [`TriageError`] is what callers see. Malformed generated output never
//! appears here: each stage recovers from it locally with a documented
//! fallback.

use std::path::PathBuf;
use triage_index::IndexError;
use triage_llm::GenerationError;
use triage_model::ValidationError;
use triage_retrieval::RetrievalError;

/// Pipeline-level error
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// Invalid caller input; raised before any stage runs
    #[error("invalid incident: {0}")]
    Validation(#[from] ValidationError),

    /// A backend failed its startup health check
    #[error("backend '{backend}' unavailable: {reason}")]
    BackendUnavailable {
        /// Backend role ("generation" or "embedding") and name
        backend: String,
        /// Underlying cause
        reason: String,
    },

    /// Generation call failed mid-pipeline
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Retrieval failed mid-pipeline
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Index could not be opened
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Filesystem failure outside the corpus
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Orchestrator attempted a stage transition outside the fixed order
    #[error("illegal stage transition: {from} -> {to}")]
    IllegalTransition {
        /// Current stage
        from: &'static str,
        /// Requested stage
        to: &'static str,
    },
}

impl TriageError {
    /// Whether the caller supplied bad input
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether a backend is unreachable (startup or mid-run)
    #[inline]
    #[must_use]
    pub fn is_backend_unavailable(&self) -> bool {
        match self {
            Self::BackendUnavailable { .. } => true,
            Self::Generation(e) => e.is_unavailable(),
            _ => false,
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create backend-unavailable error
    pub fn backend_unavailable(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file cannot be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// YAML does not match the schema
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted field path
        field: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Metrics collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Feedback log cannot be written or read
    #[error("feedback log {path}: {source}")]
    Io {
        /// Log path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record cannot be encoded or a stored line cannot be decoded
    #[error("feedback record encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_caller_error() {
        let err: TriageError = ValidationError::EmptyField { field: "incident_id" }.into();
        assert!(err.is_caller_error());
        assert!(!err.is_backend_unavailable());
    }

    #[test]
    fn unreachable_generation_counts_as_unavailable() {
        let err: TriageError = GenerationError::Unavailable {
            backend: "ollama".into(),
            reason: "refused".into(),
        }
        .into();
        assert!(err.is_backend_unavailable());
        assert!(!err.is_caller_error());
    }

    #[test]
    fn backend_unavailable_display() {
        let err = TriageError::backend_unavailable("generation/ollama", "model not pulled");
        assert_eq!(
            err.to_string(),
            "backend 'generation/ollama' unavailable: model not pulled"
        );
    }
}
