// src/embedding/fixed.rs
// Deterministic embedder for tests: hashes text into a stable pseudo-vector.

use async_trait::async_trait;

use super::{Embedder, Embedding};
use crate::config::engine::EMBEDDING_DIM;
use crate::error::CoreError;

/// Produces a deterministic embedding for a given string by seeding a small
/// PRNG from the text's bytes. Two equal strings always embed identically;
/// unrelated strings land far apart in cosine space with high probability.
#[derive(Debug, Default)]
pub struct FixedEmbedder;

impl FixedEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn vector_for(text: &str) -> Vec<f32> {
        let mut state: u64 = 1469598103934665603;
        for byte in text.as_bytes() {
            state ^= *byte as u64;
            state = state.wrapping_mul(1099511628211);
        }

        let mut out = Vec::with_capacity(EMBEDDING_DIM);
        let mut x = state;
        for _ in 0..EMBEDDING_DIM {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let v = (x % 2000) as f32 / 1000.0 - 1.0;
            out.push(v);
        }
        out
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, CoreError> {
        Embedding::new(Self::vector_for(text))
    }
}
