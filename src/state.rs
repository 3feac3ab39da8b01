// src/state.rs
// Application state: the wired-together usefulness engine, shared via axum.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::base_retriever::{BaseRetriever, EmptyRetriever};
use crate::config::AppConfig;
use crate::embedding::http::HttpEmbedder;
use crate::embedding::Embedder;
use crate::error::CoreResult;
use crate::fact_registry::{AlwaysPresent, FactRegistry};
use crate::memory::{Decayer, RecallBooster, ScoreStore, SignalIngestor, SqliteScoreStore, StatsAggregator};

/// Shared application state, composed once at startup and cloned (cheaply,
/// via `Arc`) into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScoreStore>,
    pub embedder: Arc<dyn Embedder>,
    pub base_retriever: Arc<dyn BaseRetriever>,
    pub signals: Arc<SignalIngestor>,
    pub recall: Arc<RecallBooster>,
    pub stats: Arc<StatsAggregator>,
    pub default_usefulness_weight: f32,
    pub decay_cancel: CancellationToken,
}

impl AppState {
    /// Builds the full engine from an already-open connection pool, wires
    /// the background decay sweep, and spawns it. The fact registry and base
    /// retriever default to `AlwaysPresent`/`EmptyRetriever`, since both are
    /// external collaborators this crate doesn't own in production — a real
    /// deployment wires its own via `with_collaborators`.
    pub async fn new(pool: SqlitePool, config: &AppConfig) -> CoreResult<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(&config.embedding));
        Self::with_collaborators(pool, config, Arc::new(AlwaysPresent), Arc::new(EmptyRetriever), embedder).await
    }

    pub async fn with_fact_registry(
        pool: SqlitePool,
        config: &AppConfig,
        facts: Arc<dyn FactRegistry>,
    ) -> CoreResult<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(&config.embedding));
        Self::with_collaborators(pool, config, facts, Arc::new(EmptyRetriever), embedder).await
    }

    /// Builds the engine from fully explicit collaborators. Used by
    /// production startup (via `new`/`with_fact_registry`) and by tests that
    /// need to swap in a deterministic embedder or a scripted fact registry
    /// and base retriever.
    pub async fn with_collaborators(
        pool: SqlitePool,
        config: &AppConfig,
        facts: Arc<dyn FactRegistry>,
        base_retriever: Arc<dyn BaseRetriever>,
        embedder: Arc<dyn Embedder>,
    ) -> CoreResult<Self> {
        let store: Arc<dyn ScoreStore> = Arc::new(SqliteScoreStore::from_pool(pool).await?);

        let signals = Arc::new(SignalIngestor::new(
            store.clone(),
            embedder.clone(),
            facts,
            config.engine.clone(),
        ));
        let recall = Arc::new(RecallBooster::new(
            store.clone(),
            embedder.clone(),
            config.engine.decay_lambda_per_day,
        ));
        let stats = Arc::new(StatsAggregator::new(store.clone()));

        let decayer = Arc::new(Decayer::new(
            store.clone(),
            config.engine.decay_lambda_per_day,
            config.engine.sweep_interval_seconds,
        ));
        let decay_cancel = CancellationToken::new();
        decayer.spawn(decay_cancel.clone());

        Ok(Self {
            store,
            embedder,
            base_retriever,
            signals,
            recall,
            stats,
            default_usefulness_weight: config.engine.default_usefulness_weight,
            decay_cancel,
        })
    }
}
