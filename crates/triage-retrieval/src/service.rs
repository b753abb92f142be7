//! Retrieval service over the embedding index
//!
//! Owns corpus (re)indexing and exposes search and lookup to the triage
//! stages. Reindexing embeds the full corpus before touching the index and
//! then swaps the contents in one step, so searches never observe a
//! half-built index.

use crate::category::infer_category;
use crate::corpus::CorpusSource;
use crate::error::RetrievalError;
use crate::playbook;
use moka::future::Cache;
use std::sync::Arc;
use triage_index::{EmbeddingIndex, NewDocument};
use triage_model::{Category, DocumentRecord, RetrievalResult};

/// Outcome of a full reindex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    /// Documents supplied by the corpus
    pub discovered: usize,
    /// Documents now in the index
    pub indexed: usize,
    /// Documents skipped because embedding failed
    pub failed: usize,
}

/// Search and lookup over indexed playbooks
#[derive(Debug, Clone)]
pub struct RetrievalService {
    index: Arc<EmbeddingIndex>,
    content_cache: Cache<String, Arc<str>>,
}

impl RetrievalService {
    /// Default number of cached playbook bodies
    pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

    /// Create service over `index`
    #[must_use]
    pub fn new(index: Arc<EmbeddingIndex>) -> Self {
        Self::with_cache_capacity(index, Self::DEFAULT_CACHE_CAPACITY)
    }

    /// Create service with a custom content cache size
    #[must_use]
    pub fn with_cache_capacity(index: Arc<EmbeddingIndex>, capacity: u64) -> Self {
        Self {
            index,
            content_cache: Cache::new(capacity),
        }
    }

    /// Underlying index
    #[inline]
    #[must_use]
    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    /// Replace the index contents with `corpus`
    ///
    /// Each document gets a title from its first heading and a category from
    /// the keyword table. A document whose embedding fails is logged and
    /// skipped. An empty corpus leaves the index empty.
    ///
    /// # Errors
    /// The corpus cannot be listed or the index store rejects the swap.
    pub async fn reindex_all(&self, corpus: &dyn CorpusSource) -> Result<ReindexReport, RetrievalError> {
        let docs = corpus.load().await?;
        let discovered = docs.len();
        tracing::info!(source = %corpus.describe(), documents = discovered, "reindexing corpus");

        let mut records = Vec::with_capacity(discovered);
        let mut failed = 0;
        for doc in docs {
            let title = playbook::title(&doc.content, &doc.stem);
            let category = infer_category(&doc.stem, &doc.content);
            let path = doc.path.clone();
            match self
                .index
                .prepare(NewDocument::new(doc.path, title, doc.content, category))
                .await
            {
                Ok(record) => {
                    tracing::debug!(path = %record.path, title = %record.title, %category, "embedded runbook");
                    records.push(record);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(path = %path, error = %e, "failed to embed runbook");
                }
            }
        }

        let indexed = self.index.replace_all(records)?;
        self.content_cache.invalidate_all();
        tracing::info!(indexed, failed, "reindex complete");

        Ok(ReindexReport {
            discovered,
            indexed,
            failed,
        })
    }

    /// Rank playbooks against `query`
    ///
    /// # Errors
    /// Query embedding failure.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<Category>,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let hits = self.index.search(query, top_k, category).await?;
        tracing::debug!(query_chars = query.len(), top_k, ?category, hits = hits.len(), "search");
        Ok(hits)
    }

    /// Raw content of a playbook for citation rendering
    ///
    /// Reads the file at `path`, falling back to the indexed text when the
    /// file is gone. Returns `None` when neither is available.
    pub async fn get_by_path(&self, path: &str) -> Option<Arc<str>> {
        if let Some(hit) = self.content_cache.get(path).await {
            return Some(hit);
        }

        let content: Arc<str> = match tokio::fs::read_to_string(path).await {
            Ok(text) => Arc::from(text),
            Err(e) => match self.index.get(path) {
                Some(record) => Arc::from(record.content.as_str()),
                None => {
                    tracing::warn!(path, error = %e, "runbook unreadable");
                    return None;
                }
            },
        };
        self.content_cache
            .insert(path.to_string(), Arc::clone(&content))
            .await;
        Some(content)
    }

    /// Every indexed playbook
    #[must_use]
    pub fn list_all(&self) -> Vec<Arc<DocumentRecord>> {
        self.index.list_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::StaticCorpus;
    use triage_index::HashingEmbedder;

    fn service() -> RetrievalService {
        RetrievalService::new(Arc::new(EmbeddingIndex::new(Arc::new(HashingEmbedder::default()))))
    }

    #[tokio::test]
    async fn reindex_infers_title_and_category() {
        let svc = service();
        let corpus = StaticCorpus::new().with_document(
            "runbooks/pg_pool.md",
            "# Postgres pool exhaustion\n\n## Root Causes\nleak",
        );
        let report = svc.reindex_all(&corpus).await.unwrap();
        assert_eq!(report, ReindexReport { discovered: 1, indexed: 1, failed: 0 });

        let all = svc.list_all();
        assert_eq!(all[0].title, "Postgres pool exhaustion");
        assert_eq!(all[0].category, Category::Database);
    }

    #[tokio::test]
    async fn reindex_replaces_previous_corpus() {
        let svc = service();
        svc.reindex_all(&StaticCorpus::new().with_document("a.md", "# A")).await.unwrap();
        svc.reindex_all(&StaticCorpus::new().with_document("b.md", "# B")).await.unwrap();
        let paths: Vec<_> = svc.list_all().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, ["b.md"]);
    }

    #[tokio::test]
    async fn get_by_path_falls_back_to_index_then_none() {
        let svc = service();
        svc.reindex_all(&StaticCorpus::new().with_document("virtual/x.md", "# X\nbody"))
            .await
            .unwrap();
        assert_eq!(svc.get_by_path("virtual/x.md").await.as_deref(), Some("# X\nbody"));
        assert!(svc.get_by_path("virtual/missing.md").await.is_none());
    }

    #[tokio::test]
    async fn get_by_path_prefers_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("disk.md");
        std::fs::write(&file, "# On disk").unwrap();
        let svc = service();
        let text = svc.get_by_path(file.to_str().unwrap()).await.unwrap();
        assert_eq!(&*text, "# On disk");
    }
}
