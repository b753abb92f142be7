//! Exhaustive-scan embedding index
//!
//! Provides [`EmbeddingIndex`], an in-memory list of embedded playbooks
//! queried by cosine similarity against every stored vector.
//!
//! Records live behind a `parking_lot::RwLock` so searches run concurrently
//! while mutations are serialised. When a [`DocumentStore`] is attached every
//! mutation is written through to it before the in-memory list changes.
//!
//! Cost is linear in corpus size per query; this is sized for corpora in
//! the hundreds of documents.

use crate::embedder::{check_dimensions, Embedder};
use crate::error::IndexError;
use crate::similarity::cosine_similarity;
use crate::store::DocumentStore;
use parking_lot::RwLock;
use std::sync::Arc;
use triage_model::{Category, DocumentRecord, RetrievalResult};

/// Document awaiting embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    /// Unique path
    pub path: String,
    /// Display title
    pub title: String,
    /// Full text, embedded as-is
    pub content: String,
    /// Category label
    pub category: Category,
}

impl NewDocument {
    /// Create document
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            content: content.into(),
            category,
        }
    }
}

/// Similarity index over embedded documents
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    records: RwLock<Vec<Arc<DocumentRecord>>>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("model", &self.embedder.model_name())
            .field("dimensions", &self.embedder.dimensions())
            .field("len", &self.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl EmbeddingIndex {
    /// Create empty in-memory index
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: RwLock::new(Vec::new()),
            store: None,
        }
    }

    /// Open index backed by `store`, loading every persisted record
    ///
    /// Records whose embedding length differs from the embedder's are
    /// skipped with a warning; the next reindex replaces them.
    ///
    /// # Errors
    /// The store cannot be read.
    pub fn open(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, IndexError> {
        let dims = embedder.dimensions();
        let loaded = store.load_all()?;
        let total = loaded.len();
        let records: Vec<_> = loaded
            .into_iter()
            .filter(|r| {
                let ok = r.dimensions() == dims;
                if !ok {
                    tracing::warn!(path = %r.path, stored = r.dimensions(), expected = dims, "skipping stored record with stale embedding");
                }
                ok
            })
            .map(Arc::new)
            .collect();
        tracing::info!(loaded = records.len(), skipped = total - records.len(), "opened persistent index");

        Ok(Self {
            embedder,
            records: RwLock::new(records),
            store: Some(store),
        })
    }

    /// Embedder used for documents and queries
    #[inline]
    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Embed a document without storing it
    ///
    /// # Errors
    /// Embedding failure or wrong vector length.
    pub async fn prepare(&self, doc: NewDocument) -> Result<DocumentRecord, IndexError> {
        let embedding = self.embedder.embed(&doc.content).await?;
        check_dimensions(self.embedder.dimensions(), &embedding)?;
        Ok(DocumentRecord::new(
            doc.path,
            doc.title,
            doc.content,
            doc.category,
            embedding,
        ))
    }

    /// Embed and store a document, replacing any record with the same path
    ///
    /// # Errors
    /// Embedding or store failure; the index is unchanged on error.
    pub async fn upsert(&self, doc: NewDocument) -> Result<Arc<DocumentRecord>, IndexError> {
        let record = self.prepare(doc).await?;
        self.upsert_record(record)
    }

    /// Store a record with a precomputed embedding
    ///
    /// The replaced record, if any, is removed and the new one appended, so
    /// storage order matches the persisted row order.
    ///
    /// # Errors
    /// Wrong vector length or store failure.
    pub fn upsert_record(&self, record: DocumentRecord) -> Result<Arc<DocumentRecord>, IndexError> {
        check_dimensions(self.embedder.dimensions(), &record.embedding)?;
        let record = Arc::new(record);

        let mut records = self.records.write();
        if let Some(store) = &self.store {
            store.upsert(&record)?;
        }
        records.retain(|r| r.path != record.path);
        records.push(Arc::clone(&record));
        tracing::debug!(path = %record.path, category = %record.category, "upserted document");
        Ok(record)
    }

    /// Rank stored documents against `query`
    ///
    /// Returns at most `top_k` results by descending similarity; equal scores
    /// keep storage order. With `category` set, only that category is scored.
    ///
    /// # Errors
    /// Query embedding failure.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<Category>,
    ) -> Result<Vec<RetrievalResult>, IndexError> {
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed(query).await?;
        Ok(self.search_vector(&query_vec, top_k, category))
    }

    /// Rank stored documents against a precomputed query vector
    #[must_use]
    pub fn search_vector(
        &self,
        query: &[f32],
        top_k: usize,
        category: Option<Category>,
    ) -> Vec<RetrievalResult> {
        if top_k == 0 {
            return Vec::new();
        }
        let records = self.records.read();
        let mut hits: Vec<RetrievalResult> = records
            .iter()
            .filter(|r| category.map_or(true, |c| r.category == c))
            .map(|r| RetrievalResult::new(Arc::clone(r), cosine_similarity(query, &r.embedding)))
            .collect();
        drop(records);

        // stable: ties keep storage order
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(top_k);
        hits
    }

    /// Every stored record in storage order
    #[must_use]
    pub fn list_all(&self) -> Vec<Arc<DocumentRecord>> {
        self.records.read().clone()
    }

    /// Look up a record by path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<DocumentRecord>> {
        self.records.read().iter().find(|r| r.path == path).cloned()
    }

    /// Remove a record; returns whether one existed
    ///
    /// # Errors
    /// Store failure.
    pub fn delete(&self, path: &str) -> Result<bool, IndexError> {
        let mut records = self.records.write();
        if let Some(store) = &self.store {
            store.delete(path)?;
        }
        let before = records.len();
        records.retain(|r| r.path != path);
        Ok(records.len() != before)
    }

    /// Remove every record
    ///
    /// # Errors
    /// Store failure.
    pub fn clear(&self) -> Result<(), IndexError> {
        let mut records = self.records.write();
        if let Some(store) = &self.store {
            store.clear()?;
        }
        records.clear();
        tracing::info!("index cleared");
        Ok(())
    }

    /// Atomically replace the whole contents
    ///
    /// Later records win over earlier ones with the same path. Concurrent
    /// searches see either the old or the new contents, never a partial
    /// index.
    ///
    /// # Errors
    /// Wrong vector length or store failure; the old contents survive.
    pub fn replace_all(&self, incoming: Vec<DocumentRecord>) -> Result<usize, IndexError> {
        let dims = self.embedder.dimensions();
        let mut next: Vec<DocumentRecord> = Vec::with_capacity(incoming.len());
        for record in incoming {
            check_dimensions(dims, &record.embedding)?;
            next.retain(|r| r.path != record.path);
            next.push(record);
        }

        let mut records = self.records.write();
        if let Some(store) = &self.store {
            store.replace_all(&next)?;
        }
        *records = next.into_iter().map(Arc::new).collect();
        let n = records.len();
        tracing::info!(documents = n, "index replaced");
        Ok(n)
    }
}
