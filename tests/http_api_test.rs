// tests/http_api_test.rs
// In-process HTTP integration tests against the real axum router (spec
// section 6's client-facing validation table), driven without a real socket
// via `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use usefulness_engine::base_retriever::{BaseRetriever, RetrievedFact};
use usefulness_engine::config::AppConfig;
use usefulness_engine::embedding::fixed::FixedEmbedder;
use usefulness_engine::embedding::Embedder;
use usefulness_engine::error::CoreResult;
use usefulness_engine::fact_registry::FactRegistry;
use usefulness_engine::http;
use usefulness_engine::state::AppState;

/// A fact registry that only recognizes the fact ids it's told about, so
/// tests can exercise the 404 "unknown fact" path.
struct ScriptedRegistry {
    known: Vec<String>,
}

#[async_trait]
impl FactRegistry for ScriptedRegistry {
    async fn exists(&self, _bank_id: &str, fact_id: &str) -> bool {
        self.known.iter().any(|f| f == fact_id)
    }
}

/// A base retriever that always returns the same fixed candidate set,
/// regardless of query, so recall tests get deterministic input.
struct ScriptedRetriever {
    facts: Vec<RetrievedFact>,
}

#[async_trait]
impl BaseRetriever for ScriptedRetriever {
    async fn retrieve(&self, _bank_id: &str, _query: &str) -> CoreResult<Vec<RetrievedFact>> {
        Ok(self.facts.clone())
    }
}

/// An embedder that always fails, for exercising RecallBooster's
/// fall-back-to-base-results behavior (spec section 7).
struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> CoreResult<usefulness_engine::embedding::Embedding> {
        Err(usefulness_engine::error::CoreError::EmbedFailed("simulated upstream outage".to_string()))
    }
}

/// Builds a full app over a file-backed (not `:memory:`) SQLite database, so
/// the pool can use more than one connection the way a real deployment does.
async fn test_app(known_facts: Vec<String>) -> (axum::Router, NamedTempFile) {
    test_app_with_embedder(known_facts, Arc::new(FixedEmbedder::new())).await
}

async fn test_app_with_embedder(
    known_facts: Vec<String>,
    embedder: Arc<dyn Embedder>,
) -> (axum::Router, NamedTempFile) {
    let db_file = NamedTempFile::new().expect("temp sqlite file");
    let url = format!("sqlite://{}?mode=rwc", db_file.path().display());

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("file-backed sqlite pool");

    let config = AppConfig::from_env();
    let facts: Arc<dyn FactRegistry> = Arc::new(ScriptedRegistry { known: known_facts });
    let base_retriever = Arc::new(ScriptedRetriever {
        facts: vec![RetrievedFact {
            fact_id: "fact-1".to_string(),
            base_score: 0.8,
            text: "Bob works at TechCorp".to_string(),
        }],
    });

    let state = AppState::with_collaborators(pool, &config, facts, base_retriever, embedder)
        .await
        .expect("app state");

    (http::router(Arc::new(state)), db_file)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("valid json body")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let (app, _db) = test_app(vec![]).await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn signal_with_missing_query_is_rejected() {
    let (app, _db) = test_app(vec!["fact-1".to_string()]).await;
    let body = json!({
        "signals": [{
            "fact_id": "fact-1",
            "signal_type": "helpful",
            "confidence": 1.0,
            "query": "",
        }]
    });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/signal", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn signal_with_invalid_signal_type_is_rejected() {
    let (app, _db) = test_app(vec!["fact-1".to_string()]).await;
    let body = json!({
        "signals": [{
            "fact_id": "fact-1",
            "signal_type": "not-a-real-type",
            "confidence": 1.0,
            "query": "how do I reset my password",
        }]
    });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/signal", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn signal_with_out_of_range_confidence_is_rejected() {
    let (app, _db) = test_app(vec!["fact-1".to_string()]).await;
    let body = json!({
        "signals": [{
            "fact_id": "fact-1",
            "signal_type": "helpful",
            "confidence": 1.5,
            "query": "how do I reset my password",
        }]
    });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/signal", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn signal_for_unknown_fact_is_not_found() {
    let (app, _db) = test_app(vec!["fact-1".to_string()]).await;
    let body = json!({
        "signals": [{
            "fact_id": "fact-does-not-exist",
            "signal_type": "helpful",
            "confidence": 1.0,
            "query": "how do I reset my password",
        }]
    });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/signal", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signal_with_empty_batch_is_rejected() {
    let (app, _db) = test_app(vec!["fact-1".to_string()]).await;
    let body = json!({ "signals": [] });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/signal", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn valid_signal_is_accepted_and_updates_stats() {
    let (app, _db) = test_app(vec!["fact-1".to_string()]).await;
    let body = json!({
        "signals": [{
            "fact_id": "fact-1",
            "signal_type": "helpful",
            "confidence": 1.0,
            "query": "how do I reset my password",
        }]
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/signal", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["signals_processed"], json!(1));

    let stats_response = app
        .oneshot(
            Request::builder()
                .uri("/v1/tenant-a/banks/bank-a/facts/fact-1/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stats_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stats_for_fact_with_no_signals_is_not_found() {
    let (app, _db) = test_app(vec!["fact-1".to_string()]).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/tenant-a/banks/bank-a/facts/fact-1/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recall_with_missing_query_is_rejected() {
    let (app, _db) = test_app(vec![]).await;
    let body = json!({ "query": "   ", "boost_by_usefulness": true });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/memories/recall", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn recall_with_invalid_weight_is_rejected() {
    let (app, _db) = test_app(vec![]).await;
    let body = json!({
        "query": "how do I reset my password",
        "boost_by_usefulness": true,
        "usefulness_weight": 4.0,
    });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/memories/recall", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn recall_returns_base_retriever_candidates_with_text() {
    let (app, _db) = test_app(vec![]).await;
    let body = json!({
        "query": "how do I reset my password",
        "boost_by_usefulness": false,
    });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/memories/recall", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    let results = payload["results"].as_array().expect("results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], json!("fact-1"));
    assert_eq!(results[0]["text"], json!("Bob works at TechCorp"));
}

#[tokio::test]
async fn recall_falls_back_to_base_results_when_boost_fails() {
    // RecallBooster needs the embedder to score usefulness; if it's down, the
    // enclosing recall must still succeed with the base retriever's own
    // ordering rather than surfacing a 5xx (spec section 7).
    let (app, _db) = test_app_with_embedder(vec![], Arc::new(FailingEmbedder)).await;
    let body = json!({
        "query": "how do I reset my password",
        "boost_by_usefulness": true,
        "usefulness_weight": 1.0,
    });
    let response = app
        .oneshot(json_request("POST", "/v1/tenant-a/banks/bank-a/memories/recall", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    let results = payload["results"].as_array().expect("results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], json!("fact-1"));
    assert_eq!(results[0]["final_score"], json!(0.8));
    assert_eq!(results[0]["usefulness"], json!(0.5));
}
