//! Embedding contract and the offline hashing embedder
//!
//! Any backend implementing [`Embedder`] can feed an
//! [`EmbeddingIndex`](crate::EmbeddingIndex). Dimensionality must stay
//! constant for the lifetime of one index.

use crate::error::EmbeddingError;
use crate::similarity::l2_normalize;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Converts text into a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Length of every vector produced
    fn dimensions(&self) -> usize;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Verify the backend answers with correctly sized vectors
    async fn health_check(&self) -> Result<(), EmbeddingError> {
        let probe = self.embed("health check").await?;
        check_dimensions(self.dimensions(), &probe)
    }
}

/// Reject a vector whose length differs from `expected`
///
/// # Errors
/// `EmbeddingError::DimensionMismatch` on a length difference.
pub fn check_dimensions(expected: usize, vector: &[f32]) -> Result<(), EmbeddingError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

/// Deterministic feature-hashing embedder
///
/// Lowercased alphanumeric tokens are hashed with SHA-256 into signed
/// buckets and the result is L2-normalised. Texts sharing vocabulary score
/// high; text with no tokens embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    /// Model name reported by this embedder
    pub const MODEL: &'static str = "feature-hash-sha256";

    /// Create embedder with `dims` buckets (at least 1)
    #[inline]
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Synchronous embedding used by the async impl
    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dims];
        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = u64::from_le_bytes(bucket_bytes);
            #[allow(clippy::cast_possible_truncation)]
            let slot = (bucket % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[slot] += sign;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        Self::MODEL
    }

    async fn health_check(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[test]
    fn hashing_is_deterministic() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed_sync("Connection refused"), e.embed_sync("connection REFUSED"));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let e = HashingEmbedder::default();
        let q = e.embed_sync("database connection pool exhausted");
        let near = e.embed_sync("Database connection pool exhaustion runbook: pool exhausted");
        let far = e.embed_sync("TLS certificate expiry on edge proxy");
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed_sync("  --- ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dims_are_bumped() {
        assert_eq!(HashingEmbedder::new(0).dimensions(), 1);
    }

    #[tokio::test]
    async fn default_health_check_validates_length() {
        assert!(HashingEmbedder::new(8).health_check().await.is_ok());
        assert!(check_dimensions(8, &[0.0; 4]).is_err());
    }
}
