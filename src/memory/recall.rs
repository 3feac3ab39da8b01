// src/memory/recall.rs
// RecallBooster: blend a retriever's base relevance score with learned usefulness.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::embedding::Embedder;
use crate::error::CoreResult;
use crate::memory::decay;
use crate::memory::store::{NearestMatch, ScoreStore};

const NEUTRAL_USEFULNESS: f32 = 0.5;

/// How many bank-wide nearest contexts to probe in one `find_nearest_any`
/// call before falling back to a per-fact `find_nearest` lookup. Padding
/// beyond `base_results.len()` lowers the odds that a fact with several
/// competing contexts in the bank gets pushed out of the batch.
const BATCH_PROBE_PADDING: usize = 8;

/// Recognized recall-boost options (spec section 9's "dynamic configuration
/// object" guidance: explicit struct, enumerated fields, no passthrough bag).
#[derive(Debug, Clone)]
pub struct RecallOptions {
    pub enabled: bool,
    pub usefulness_weight: f32,
    pub min_usefulness: f32,
    pub context_similarity_floor: f32,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            usefulness_weight: 0.3,
            min_usefulness: 0.0,
            context_similarity_floor: 0.7,
        }
    }
}

/// A single ranked result returned from `RecallBooster::boost`.
#[derive(Debug, Clone)]
pub struct BoostedScore {
    pub fact_id: String,
    pub base_score: f32,
    pub usefulness: f32,
    pub final_score: f32,
}

/// Blends a retriever-supplied base relevance score with the learned
/// usefulness of the fact in the current query context (spec section 4.E).
pub struct RecallBooster {
    store: Arc<dyn ScoreStore>,
    embedder: Arc<dyn Embedder>,
    default_lambda_per_day: f32,
}

impl RecallBooster {
    pub fn new(store: Arc<dyn ScoreStore>, embedder: Arc<dyn Embedder>, default_lambda_per_day: f32) -> Self {
        Self {
            store,
            embedder,
            default_lambda_per_day,
        }
    }

    /// Re-ranks `base_results` by fusing each fact's base relevance with its
    /// learned usefulness for `query_text`. Returns `base_results` unchanged,
    /// in their original order, when `opts.enabled` is false, `base_results`
    /// is empty, or `usefulness_weight` is zero — the fusion term `w * u`
    /// vanishes identically in that last case, so re-sorting would only risk
    /// reordering equal-`final_score` ties and breaking the identity
    /// guarantee (spec section 8).
    pub async fn boost(
        &self,
        bank_id: &str,
        query_text: &str,
        base_results: &[(String, f32)],
        opts: &RecallOptions,
    ) -> CoreResult<Vec<BoostedScore>> {
        let w = opts.usefulness_weight.clamp(0.0, 1.0);

        if !opts.enabled || base_results.is_empty() || w == 0.0 {
            return Ok(base_results
                .iter()
                .map(|(fact_id, base_score)| BoostedScore {
                    fact_id: fact_id.clone(),
                    base_score: *base_score,
                    usefulness: NEUTRAL_USEFULNESS,
                    final_score: *base_score,
                })
                .collect());
        }

        let embedding = self.embedder.embed(query_text).await?;
        let now = Utc::now();

        // One batched bank-wide probe covers most candidates in a single
        // store round-trip; only facts it misses fall back to a per-fact
        // `find_nearest` call (spec section 4.B: `find_nearest_any` exists
        // precisely for "boosting at recall time").
        let probe_k = base_results.len() + BATCH_PROBE_PADDING;
        let batch_hits = self.store.find_nearest_any(bank_id, &embedding, probe_k).await?;
        let mut best_by_fact: HashMap<String, NearestMatch> = HashMap::new();
        for hit in batch_hits {
            best_by_fact
                .entry(hit.context.fact_id.clone())
                .and_modify(|existing| {
                    if hit.similarity > existing.similarity {
                        *existing = hit.clone();
                    }
                })
                .or_insert(hit);
        }

        let mut boosted = Vec::with_capacity(base_results.len());
        for (fact_id, base_score) in base_results {
            let nearest = match best_by_fact.get(fact_id) {
                Some(hit) => Some(hit.clone()),
                None => self.store.find_nearest(bank_id, fact_id, &embedding).await?,
            };

            let usefulness = match nearest {
                Some(m) if m.similarity >= opts.context_similarity_floor => decay::decay(
                    m.context.usefulness_score,
                    m.context.last_decay_at,
                    now,
                    self.default_lambda_per_day,
                ),
                _ => NEUTRAL_USEFULNESS,
            };

            if usefulness < opts.min_usefulness {
                continue;
            }

            let final_score = (1.0 - w) * base_score + w * usefulness;
            boosted.push(BoostedScore {
                fact_id: fact_id.clone(),
                base_score: *base_score,
                usefulness,
                final_score,
            });
        }

        boosted.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.base_score.partial_cmp(&a.base_score).unwrap_or(Ordering::Equal))
                .then_with(|| a.fact_id.cmp(&b.fact_id))
        });

        Ok(boosted)
    }
}
