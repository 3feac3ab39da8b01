// src/http/signal.rs
// POST /v1/{tenant}/banks/{bank_id}/signal: record a batch of feedback signals.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::error::{ApiResult, IntoApiError};
use crate::memory::SignalType;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignalItem {
    pub fact_id: String,
    pub signal_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    pub query: String,
    pub context: Option<String>,
}

fn default_confidence() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct SignalBatchRequest {
    pub signals: Vec<SignalItem>,
}

#[derive(Debug, Serialize)]
pub struct SignalBatchResponse {
    pub success: bool,
    pub signals_processed: u64,
    pub updated_facts: Vec<String>,
}

pub async fn record_signals(
    State(state): State<Arc<AppState>>,
    Path((_tenant, bank_id)): Path<(String, String)>,
    Json(req): Json<SignalBatchRequest>,
) -> ApiResult<Json<SignalBatchResponse>> {
    if req.signals.is_empty() {
        return Err(crate::error::CoreError::EmptySignalBatch.into());
    }

    let mut updated_facts = HashSet::new();
    for item in &req.signals {
        let signal_type = SignalType::parse(&item.signal_type).into_api()?;
        let outcome = state
            .signals
            .apply_signal(
                &bank_id,
                &item.fact_id,
                &item.query,
                signal_type,
                item.confidence,
                item.context.clone(),
            )
            .await
            .into_api()?;
        updated_facts.insert(outcome.fact_id);
    }

    Ok(Json(SignalBatchResponse {
        success: true,
        signals_processed: req.signals.len() as u64,
        updated_facts: updated_facts.into_iter().collect(),
    }))
}
