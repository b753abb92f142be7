//! Playbook corpus sources

use crate::error::RetrievalError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Raw playbook as read from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusDocument {
    /// Unique path
    pub path: String,
    /// File stem, used for category inference and as a fallback title
    pub stem: String,
    /// Full markdown text
    pub content: String,
}

impl CorpusDocument {
    /// Create document, deriving the stem from `path`
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let stem = Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self {
            path,
            stem,
            content: content.into(),
        }
    }
}

/// Where playbooks come from
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Load every document; an absent corpus yields an empty list
    async fn load(&self) -> Result<Vec<CorpusDocument>, RetrievalError>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

/// Markdown files (`*.md`) directly inside one directory
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    dir: PathBuf,
}

impl DirectoryCorpus {
    /// Create source for `dir`
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being read
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CorpusSource for DirectoryCorpus {
    async fn load(&self) -> Result<Vec<CorpusDocument>, RetrievalError> {
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            tracing::warn!(dir = %self.dir.display(), "runbook directory not found, corpus is empty");
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| RetrievalError::io_error(&self.dir, e))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RetrievalError::io_error(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                paths.push(path);
            }
        }
        paths.sort();
        tracing::info!(dir = %self.dir.display(), found = paths.len(), "found runbooks to index");

        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => docs.push(CorpusDocument::new(path.to_string_lossy(), content)),
                Err(e) => tracing::error!(path = %path.display(), error = %e, "skipping unreadable runbook"),
            }
        }
        Ok(docs)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Fixed in-memory corpus
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    docs: Vec<CorpusDocument>,
}

impl StaticCorpus {
    /// Create empty corpus
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document
    #[must_use]
    pub fn with_document(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.docs.push(CorpusDocument::new(path, content));
        self
    }
}

#[async_trait]
impl CorpusSource for StaticCorpus {
    async fn load(&self) -> Result<Vec<CorpusDocument>, RetrievalError> {
        Ok(self.docs.clone())
    }

    fn describe(&self) -> String {
        format!("static corpus ({} documents)", self.docs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_is_derived_from_path() {
        let doc = CorpusDocument::new("data/runbooks/redis_down.md", "# Redis");
        assert_eq!(doc.stem, "redis_down");
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = DirectoryCorpus::new(dir.path().join("absent"));
        assert!(corpus.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_markdown_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# B").unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let docs = DirectoryCorpus::new(dir.path()).load().await.unwrap();
        let stems: Vec<_> = docs.iter().map(|d| d.stem.as_str()).collect();
        assert_eq!(stems, ["a", "b"]);
    }
}
