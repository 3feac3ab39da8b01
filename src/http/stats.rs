// src/http/stats.rs
// GET /v1/{tenant}/banks/{bank_id}/facts/{fact_id}/stats
// GET /v1/{tenant}/banks/{bank_id}/stats/usefulness

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use super::error::{ApiResult, IntoApiError};
use crate::memory::{BankStats, FactStats};
use crate::state::AppState;

pub async fn fact_stats(
    State(state): State<Arc<AppState>>,
    Path((_tenant, bank_id, fact_id)): Path<(String, String, String)>,
) -> ApiResult<Json<FactStats>> {
    let stats = state.stats.fact_stats(&bank_id, &fact_id).await.into_api()?;
    Ok(Json(stats))
}

pub async fn bank_stats(
    State(state): State<Arc<AppState>>,
    Path((_tenant, bank_id)): Path<(String, String)>,
) -> ApiResult<Json<BankStats>> {
    let stats = state.stats.bank_stats(&bank_id).await.into_api()?;
    Ok(Json(stats))
}
