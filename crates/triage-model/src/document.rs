//! Playbook documents and retrieval hits

use crate::classification::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Indexed playbook with its embedding
///
/// `path` is the unique key inside an index; upserting the same path
/// replaces the previous record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique path identifier
    pub path: String,
    /// Display title
    pub title: String,
    /// Full text content
    pub content: String,
    /// Inferred category label
    pub category: Category,
    /// Fixed-dimension embedding vector
    pub embedding: Vec<f32>,
    /// When the record was first stored
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Create record stamped with the current time
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: Category,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            content: content.into(),
            category,
            embedding,
            created_at: Utc::now(),
        }
    }

    /// Embedding dimensionality
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// A document matched by a similarity query
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Shared handle to the stored record
    pub document: Arc<DocumentRecord>,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

impl RetrievalResult {
    /// Create result
    #[inline]
    #[must_use]
    pub fn new(document: Arc<DocumentRecord>, similarity: f32) -> Self {
        Self {
            document,
            similarity,
        }
    }

    /// Whether the hit clears a relevance threshold (inclusive)
    #[inline]
    #[must_use]
    pub fn meets(&self, threshold: f32) -> bool {
        self.similarity >= threshold
    }

    /// Lightweight citation form
    #[must_use]
    pub fn reference(&self) -> GroundingReference {
        GroundingReference {
            title: self.document.title.clone(),
            path: self.document.path.clone(),
            similarity: self.similarity,
        }
    }
}

/// Title, path and score of a grounding document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingReference {
    /// Playbook title
    pub title: String,
    /// Playbook path
    pub path: String,
    /// Similarity at retrieval time
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let doc = Arc::new(DocumentRecord::new(
            "runbooks/db.md",
            "DB pool",
            "...",
            Category::Database,
            vec![1.0, 0.0],
        ));
        assert!(RetrievalResult::new(doc.clone(), 0.3).meets(0.3));
        assert!(!RetrievalResult::new(doc, 0.299).meets(0.3));
    }

    #[test]
    fn reference_copies_identity() {
        let doc = Arc::new(DocumentRecord::new(
            "runbooks/redis.md",
            "Redis outage",
            "...",
            Category::ApiService,
            vec![0.0, 1.0],
        ));
        let r = RetrievalResult::new(doc, 0.82).reference();
        assert_eq!(r.title, "Redis outage");
        assert_eq!(r.path, "runbooks/redis.md");
        assert!((r.similarity - 0.82).abs() < f32::EPSILON);
    }
}
