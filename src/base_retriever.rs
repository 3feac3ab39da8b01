// src/base_retriever.rs
// Seam for the external semantic retriever that owns fact text and base
// relevance scoring (out of scope per spec section 1 — RecallBooster only
// fuses its output with learned usefulness).

use async_trait::async_trait;

use crate::error::CoreResult;

/// One candidate returned by the external retriever: a fact id, its base
/// relevance score in `[0, 1]` (higher is better), and its stored text.
#[derive(Debug, Clone)]
pub struct RetrievedFact {
    pub fact_id: String,
    pub base_score: f32,
    pub text: String,
}

#[async_trait]
pub trait BaseRetriever: Send + Sync {
    async fn retrieve(&self, bank_id: &str, query: &str) -> CoreResult<Vec<RetrievedFact>>;
}

/// A retriever with nothing behind it: every recall returns zero candidates.
/// Default for deployments that haven't wired a real external retriever yet.
#[derive(Debug, Default)]
pub struct EmptyRetriever;

#[async_trait]
impl BaseRetriever for EmptyRetriever {
    async fn retrieve(&self, _bank_id: &str, _query: &str) -> CoreResult<Vec<RetrievedFact>> {
        Ok(Vec::new())
    }
}
