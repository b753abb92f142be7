use std::sync::Arc;
use triage_index::{EmbeddingIndex, HashingEmbedder, SqliteDocumentStore};
use triage_model::Category;
use triage_retrieval::{DirectoryCorpus, RetrievalService, StaticCorpus};

fn service() -> RetrievalService {
    RetrievalService::new(Arc::new(EmbeddingIndex::new(Arc::new(HashingEmbedder::default()))))
}

fn write_corpus(dir: &std::path::Path) {
    std::fs::write(
        dir.join("redis_connection_refused.md"),
        "# Redis Connection Refused\n\n## Root Causes\n- redis pod evicted\n\n## Immediate Mitigation\n1. restart redis\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("postgres_pool.md"),
        "# Postgres Pool Exhaustion\n\n## Root Causes\n- connection leak\n",
    )
    .unwrap();
}

#[tokio::test]
async fn test_directory_corpus_is_searchable() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let svc = service();

    let report = svc
        .reindex_all(&DirectoryCorpus::new(dir.path()))
        .await
        .unwrap();
    assert_eq!(report.indexed, 2);

    let hits = svc.search("postgres pool exhaustion connection leak", 1, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].document.path.ends_with("postgres_pool.md"));
}

#[tokio::test]
async fn test_category_filter_restricts_results() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let svc = service();
    svc.reindex_all(&DirectoryCorpus::new(dir.path())).await.unwrap();

    let hits = svc
        .search("redis connection refused", 5, Some(Category::Network))
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_empty_corpus_then_search_is_empty() {
    let svc = service();
    svc.reindex_all(&StaticCorpus::new().with_document("a.md", "# A db"))
        .await
        .unwrap();
    let report = svc.reindex_all(&StaticCorpus::new()).await.unwrap();
    assert_eq!(report.indexed, 0);

    let hits = svc.search("anything at all", 5, None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_missing_directory_degrades_to_empty_index() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service();
    let report = svc
        .reindex_all(&DirectoryCorpus::new(dir.path().join("nope")))
        .await
        .unwrap();
    assert_eq!(report.discovered, 0);
    assert!(svc.list_all().is_empty());
}

#[tokio::test]
async fn test_persistent_reindex_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let db = dir.path().join("vector_store.db");
    let embedder = Arc::new(HashingEmbedder::default());

    {
        let store = Arc::new(SqliteDocumentStore::open(&db).unwrap());
        let index = EmbeddingIndex::open(embedder.clone(), store).unwrap();
        let svc = RetrievalService::new(Arc::new(index));
        svc.reindex_all(&DirectoryCorpus::new(dir.path())).await.unwrap();
    }

    let store = Arc::new(SqliteDocumentStore::open(&db).unwrap());
    let index = EmbeddingIndex::open(embedder, store).unwrap();
    assert_eq!(index.len(), 2);
}
