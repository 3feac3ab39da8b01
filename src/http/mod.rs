// src/http/mod.rs
// Thin axum surface over the usefulness engine (spec section 6).

pub mod error;
pub mod health;
pub mod recall;
pub mod signal;
pub mod stats;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/{tenant}/banks/{bank_id}/signal", post(signal::record_signals))
        .route(
            "/v1/{tenant}/banks/{bank_id}/facts/{fact_id}/stats",
            get(stats::fact_stats),
        )
        .route(
            "/v1/{tenant}/banks/{bank_id}/stats/usefulness",
            get(stats::bank_stats),
        )
        .route(
            "/v1/{tenant}/banks/{bank_id}/memories/recall",
            post(recall::recall),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
