// src/embedding/mod.rs
// Embedder: text -> fixed-dim unit vector (spec section 4.A).

pub mod fixed;
pub mod http;

use async_trait::async_trait;

use crate::config::engine::EMBEDDING_DIM;
use crate::error::CoreError;

/// A unit-normalized embedding of fixed dimension `EMBEDDING_DIM`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Build a unit-normalized embedding, rejecting wrong-dimension or
    /// zero-norm input.
    pub fn new(values: Vec<f32>) -> Result<Self, CoreError> {
        if values.len() != EMBEDDING_DIM {
            return Err(CoreError::EmbedFailed(format!(
                "expected {} dims, got {}",
                EMBEDDING_DIM,
                values.len()
            )));
        }

        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(CoreError::EmbedFailed("zero-norm embedding".to_string()));
        }

        let normalized = values.into_iter().map(|x| x / norm).collect();
        Ok(Self(normalized))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity between two unit vectors is just their dot product,
    /// but we don't assume callers kept normalization intact (e.g. values
    /// loaded from storage), so this computes the full cosine formula.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        cosine_similarity(&self.0, &other.0)
    }
}

/// Cosine similarity between two arbitrary (not necessarily unit) vectors.
/// Returns 0.0 for mismatched lengths or zero-norm input, matching the
/// defensive convention used throughout the corpus this engine is grounded on.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Pure text -> embedding seam. Implementations never silently substitute a
/// fallback vector on failure — `EmbedFailed` propagates to the caller.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, CoreError>;

    /// Batch embedding with a naive per-item default; implementations with a
    /// batch API (like `HttpEmbedder`) should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, CoreError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn new_rejects_wrong_dimension() {
        assert!(Embedding::new(vec![0.1, 0.2]).is_err());
    }

    #[test]
    fn new_rejects_zero_vector() {
        assert!(Embedding::new(vec![0.0; EMBEDDING_DIM]).is_err());
    }

    #[test]
    fn new_normalizes_to_unit_length() {
        let mut values = vec![0.0; EMBEDDING_DIM];
        values[0] = 3.0;
        values[1] = 4.0;
        let embedding = Embedding::new(values).unwrap();
        let norm: f32 = embedding.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
