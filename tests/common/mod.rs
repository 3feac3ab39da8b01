// tests/common/mod.rs
// Shared harness: an in-memory sqlite-backed engine wired with a deterministic embedder.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use usefulness_engine::config::engine::{EngineConfig, EMBEDDING_DIM};
use usefulness_engine::embedding::fixed::FixedEmbedder;
use usefulness_engine::embedding::{Embedder, Embedding};
use usefulness_engine::error::CoreError;
use usefulness_engine::fact_registry::{AlwaysPresent, FactRegistry};
use usefulness_engine::memory::{RecallBooster, ScoreStore, SignalIngestor, SqliteScoreStore, StatsAggregator};

/// Returns a unit vector `(cos(angle), sin(angle), 0, ..., 0)` embedded in
/// `EMBEDDING_DIM` dimensions. Two angled vectors have cosine similarity
/// `cos(a - b)`, so tests can target an exact similarity by choosing degrees
/// rather than hoping two query strings happen to hash close together.
pub fn angled_vector(angle_degrees: f32) -> Vec<f32> {
    let radians = angle_degrees.to_radians();
    let mut out = vec![0.0; EMBEDDING_DIM];
    out[0] = radians.cos();
    out[1] = radians.sin();
    out
}

/// A test embedder that returns an exact, pre-registered vector per query
/// string, for tests that need precise control over cosine similarity
/// between two distinct queries (e.g. theta_merge boundary behavior).
#[derive(Debug, Default)]
pub struct ScriptedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl ScriptedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(query.into(), vector);
        self
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, CoreError> {
        let vector = self
            .vectors
            .get(text)
            .unwrap_or_else(|| panic!("no scripted vector registered for query {text:?}"))
            .clone();
        Embedding::new(vector)
    }
}

pub struct Harness {
    pub store: Arc<dyn ScoreStore>,
    pub embedder: Arc<dyn Embedder>,
    pub signals: SignalIngestor,
    pub recall: RecallBooster,
    pub stats: StatsAggregator,
    pub config: EngineConfig,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        Self::with_embedder(config, Arc::new(FixedEmbedder::new())).await
    }

    /// Builds the harness with an explicit embedder, for tests that need
    /// precise control over the cosine similarity between two distinct
    /// queries (`FixedEmbedder` only guarantees equal strings embed equally).
    pub async fn with_embedder(config: EngineConfig, embedder: Arc<dyn Embedder>) -> Self {
        // A single shared in-memory connection: sqlite's `:memory:` database
        // is private per-connection, so the pool must be capped at one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite pool");

        let store: Arc<dyn ScoreStore> = Arc::new(
            SqliteScoreStore::from_pool(pool)
                .await
                .expect("sqlite score store"),
        );
        let facts: Arc<dyn FactRegistry> = Arc::new(AlwaysPresent);

        let signals = SignalIngestor::new(store.clone(), embedder.clone(), facts, config.clone());
        let recall = RecallBooster::new(store.clone(), embedder.clone(), config.decay_lambda_per_day);
        let stats = StatsAggregator::new(store.clone());

        Self {
            store,
            embedder,
            signals,
            recall,
            stats,
            config,
        }
    }
}
