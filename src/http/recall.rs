// src/http/recall.rs
// POST /v1/{tenant}/banks/{bank_id}/memories/recall: boost base-retriever
// candidates by learned usefulness (spec section 6).

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{ApiError, ApiResult, IntoApiError};
use crate::error::CoreError;
use crate::memory::RecallOptions;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub query: String,
    #[serde(default)]
    pub boost_by_usefulness: bool,
    pub usefulness_weight: Option<f32>,
    pub min_usefulness: Option<f32>,
    pub context_similarity_floor: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct RecallResponse {
    pub results: Vec<BoostedScoreDto>,
}

#[derive(Debug, Serialize)]
pub struct BoostedScoreDto {
    pub id: String,
    pub text: String,
    pub base_score: f32,
    pub usefulness: f32,
    pub final_score: f32,
}

pub async fn recall(
    State(state): State<Arc<AppState>>,
    Path((_tenant, bank_id)): Path<(String, String)>,
    Json(req): Json<RecallRequest>,
) -> ApiResult<Json<RecallResponse>> {
    if req.query.trim().is_empty() {
        return Err(ApiError::from(CoreError::MissingQuery));
    }
    for w in [req.usefulness_weight, req.min_usefulness, req.context_similarity_floor]
        .into_iter()
        .flatten()
    {
        if !(0.0..=1.0).contains(&w) {
            return Err(ApiError::from(CoreError::InvalidWeight(w)));
        }
    }

    let defaults = RecallOptions::default();
    let opts = RecallOptions {
        enabled: req.boost_by_usefulness,
        usefulness_weight: req.usefulness_weight.unwrap_or(state.default_usefulness_weight),
        min_usefulness: req.min_usefulness.unwrap_or(defaults.min_usefulness),
        context_similarity_floor: req.context_similarity_floor.unwrap_or(defaults.context_similarity_floor),
    };

    let retrieved = state.base_retriever.retrieve(&bank_id, &req.query).await.into_api()?;

    let text_by_fact: HashMap<String, String> =
        retrieved.iter().map(|f| (f.fact_id.clone(), f.text.clone())).collect();
    let candidates: Vec<(String, f32)> = retrieved.into_iter().map(|f| (f.fact_id, f.base_score)).collect();

    // A boost failure (embedder down, store unavailable) must never fail the
    // enclosing recall — fall back to the base retriever's own ordering
    // (spec section 7).
    let boosted = match state.recall.boost(&bank_id, &req.query, &candidates, &opts).await {
        Ok(boosted) => boosted,
        Err(e) => {
            tracing::warn!(bank_id, error = %e, "recall boost failed, falling back to base results");
            candidates
                .into_iter()
                .map(|(fact_id, base_score)| crate::memory::BoostedScore {
                    fact_id,
                    base_score,
                    usefulness: 0.5,
                    final_score: base_score,
                })
                .collect()
        }
    };

    let results = boosted
        .into_iter()
        .map(|b| BoostedScoreDto {
            text: text_by_fact.get(&b.fact_id).cloned().unwrap_or_default(),
            id: b.fact_id,
            base_score: b.base_score,
            usefulness: b.usefulness,
            final_score: b.final_score,
        })
        .collect();

    Ok(Json(RecallResponse { results }))
}
