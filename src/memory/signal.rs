// src/memory/signal.rs
// SignalIngestor: merge-or-create a query context and fold a signal into it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;
use uuid::Uuid;

use crate::config::engine::EngineConfig;
use crate::embedding::{Embedder, Embedding};
use crate::error::{CoreError, CoreResult};
use crate::fact_registry::FactRegistry;
use crate::memory::core::{QueryContextScore, Signal, SignalOutcome, SignalType};
use crate::memory::decay;
use crate::memory::store::ScoreStore;

/// Applies feedback signals to query-context scores, merging into an
/// existing context when the query embedding is close enough to one
/// already on file, otherwise creating a new one (spec section 4.C).
pub struct SignalIngestor {
    store: Arc<dyn ScoreStore>,
    embedder: Arc<dyn Embedder>,
    facts: Arc<dyn FactRegistry>,
    config: EngineConfig,
    bank_limiters: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl SignalIngestor {
    pub fn new(
        store: Arc<dyn ScoreStore>,
        embedder: Arc<dyn Embedder>,
        facts: Arc<dyn FactRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            facts,
            config,
            bank_limiters: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for(&self, bank_id: &str) -> Arc<Semaphore> {
        let mut guard = self.bank_limiters.lock().await;
        guard
            .entry(bank_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_inflight_signals_per_bank)))
            .clone()
    }

    /// Records one signal against `(bank_id, fact_id)`, merging it into the
    /// nearest existing context (cosine similarity >= `theta_merge`) or
    /// creating a new context seeded at neutral score.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_signal(
        &self,
        bank_id: &str,
        fact_id: &str,
        query_text: &str,
        signal_type: SignalType,
        confidence: f32,
        context_note: Option<String>,
    ) -> CoreResult<SignalOutcome> {
        if query_text.trim().is_empty() {
            return Err(CoreError::MissingQuery);
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(CoreError::ConfidenceOutOfRange(confidence));
        }
        if !self.facts.exists(bank_id, fact_id).await {
            return Err(CoreError::UnknownFact(fact_id.to_string()));
        }

        let limiter = self.limiter_for(bank_id).await;
        let _permit = limiter
            .try_acquire()
            .map_err(|_| CoreError::Busy(bank_id.to_string()))?;

        let embedding = self.embedder.embed(query_text).await?;
        let delta = self.config.learning_rate * confidence * signal_type.weight();

        let mut attempts = 0usize;
        loop {
            attempts += 1;
            let nearest = self.store.find_nearest(bank_id, fact_id, &embedding).await?;
            let target = nearest.filter(|m| m.similarity >= self.config.theta_merge);

            let outcome = match target {
                Some(m) => self.merge_into(bank_id, fact_id, m.context, delta).await,
                None => {
                    self.create_context(bank_id, fact_id, embedding.clone(), query_text, delta)
                        .await
                }
            };

            match outcome {
                Ok(outcome) => {
                    let signal = Signal {
                        id: Uuid::new_v4(),
                        bank_id: bank_id.to_string(),
                        fact_id: fact_id.to_string(),
                        signal_type,
                        confidence,
                        query: Some(query_text.to_string()),
                        context_note: context_note.clone(),
                        created_at: Utc::now(),
                    };
                    self.store.record_signal(outcome.context_id, &signal).await?;
                    return Ok(outcome);
                }
                Err(CoreError::StoreConflict(_)) if attempts <= self.config.max_store_retries => {
                    debug!(bank_id, fact_id, attempts, "retrying signal after store conflict");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn merge_into(
        &self,
        bank_id: &str,
        fact_id: &str,
        context: QueryContextScore,
        delta: f32,
    ) -> CoreResult<SignalOutcome> {
        let previous_score = context.usefulness_score;
        let now = Utc::now();

        let decayed = decay::decay(
            context.usefulness_score,
            context.last_decay_at,
            now,
            self.config.decay_lambda_per_day,
        );
        let new_score = (decayed + delta).clamp(0.0, 1.0);
        let new_signal_count = context.signal_count + 1;

        let updated = self
            .store
            .update(context.id, context.updated_at, new_score, new_signal_count, now, now)
            .await?;

        debug!(bank_id, fact_id, context_id = %updated.id, previous_score, new_score, "merged signal into existing context");

        Ok(SignalOutcome {
            context_id: updated.id,
            fact_id: fact_id.to_string(),
            previous_score,
            new_score: updated.usefulness_score,
            signal_count: updated.signal_count,
            created_new_context: false,
        })
    }

    async fn create_context(
        &self,
        bank_id: &str,
        fact_id: &str,
        embedding: Embedding,
        query_text: &str,
        delta: f32,
    ) -> CoreResult<SignalOutcome> {
        let neutral = 0.5;
        let score = (neutral + delta).clamp(0.0, 1.0);
        let mut context = QueryContextScore::new(
            bank_id.to_string(),
            fact_id.to_string(),
            embedding,
            Some(query_text.to_string()),
        );
        context.usefulness_score = score;
        context.signal_count = 1;
        context.last_signal_at = Some(context.created_at);

        let inserted = self.store.insert(context).await?;
        debug!(bank_id, fact_id, context_id = %inserted.id, score = inserted.usefulness_score, "created new context");

        Ok(SignalOutcome {
            context_id: inserted.id,
            fact_id: fact_id.to_string(),
            previous_score: neutral,
            new_score: inserted.usefulness_score,
            signal_count: inserted.signal_count,
            created_new_context: true,
        })
    }
}
