// src/memory/store/mod.rs
// ScoreStore: durable + ANN-indexed storage of per-context usefulness scores.

pub mod index;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::embedding::Embedding;
use crate::error::CoreError;
use crate::memory::core::{QueryContextScore, Signal};

pub use sqlite::SqliteScoreStore;

/// A candidate context returned from a nearest-neighbour probe, paired with
/// the cosine similarity that produced it.
#[derive(Debug, Clone)]
pub struct NearestMatch {
    pub context: QueryContextScore,
    pub similarity: f32,
}

/// Storage seam for query-context scores: an HNSW-backed similarity index
/// over a durable, optimistically-concurrent backing store (spec section 4.B).
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// The stored context for `fact_id` with highest cosine similarity to
    /// `embedding`, if any exist. Callers (SignalIngestor, RecallBooster)
    /// decide what similarity counts as a match; the store just ranks.
    async fn find_nearest(
        &self,
        bank_id: &str,
        fact_id: &str,
        embedding: &Embedding,
    ) -> Result<Option<NearestMatch>, CoreError>;

    /// Top-`k` nearest contexts across every fact in `bank_id`, for boosting
    /// a whole recall batch without one store round-trip per fact.
    async fn find_nearest_any(
        &self,
        bank_id: &str,
        embedding: &Embedding,
        k: usize,
    ) -> Result<Vec<NearestMatch>, CoreError>;

    /// Insert a brand-new context and index it for ANN search.
    async fn insert(&self, context: QueryContextScore) -> Result<QueryContextScore, CoreError>;

    /// Update `usefulness_score`/`signal_count`/`last_signal_at`/`last_decay_at`
    /// on an existing context under optimistic concurrency control: the
    /// update only applies if the row's `updated_at` still equals
    /// `expected_updated_at`. Returns `CoreError::StoreConflict` on mismatch
    /// so the caller can retry.
    #[allow(clippy::too_many_arguments)]
    async fn update(
        &self,
        context_id: Uuid,
        expected_updated_at: DateTime<Utc>,
        new_score: f32,
        new_signal_count: u64,
        new_last_signal_at: DateTime<Utc>,
        new_last_decay_at: DateTime<Utc>,
    ) -> Result<QueryContextScore, CoreError>;

    /// All contexts recorded for one fact, across all its query contexts.
    async fn list_by_fact(
        &self,
        bank_id: &str,
        fact_id: &str,
    ) -> Result<Vec<QueryContextScore>, CoreError>;

    /// All contexts recorded anywhere in a bank, across all facts.
    async fn list_by_bank(&self, bank_id: &str) -> Result<Vec<QueryContextScore>, CoreError>;

    /// Apply an in-place score rewrite to every context in `bank_id` whose
    /// `last_decay_at` predates the sweep cutoff. Used by the decay sweep;
    /// implementations may batch this far more efficiently than looping
    /// `update` once per context.
    async fn apply_decay_sweep(
        &self,
        bank_id: &str,
        lambda_per_day: f32,
        now: DateTime<Utc>,
    ) -> Result<u64, CoreError>;

    /// Every bank_id with at least one stored context, for the background
    /// decay sweep to iterate over.
    async fn list_bank_ids(&self) -> Result<Vec<String>, CoreError>;

    /// Append an audit-trail row for a signal against `context_id`.
    async fn record_signal(&self, context_id: Uuid, signal: &Signal) -> Result<(), CoreError>;

    /// All audit signals recorded for one fact, for `signal_breakdown`.
    async fn list_signals_by_fact(&self, bank_id: &str, fact_id: &str) -> Result<Vec<Signal>, CoreError>;

    /// All audit signals recorded anywhere in a bank, for `signal_distribution`.
    async fn list_signals_by_bank(&self, bank_id: &str) -> Result<Vec<Signal>, CoreError>;
}
