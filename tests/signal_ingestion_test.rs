// tests/signal_ingestion_test.rs
// End-to-end coverage of SignalIngestor's merge-or-create behavior.

mod common;

use std::sync::Arc;

use common::{angled_vector, Harness, ScriptedEmbedder};
use usefulness_engine::config::engine::EngineConfig;
use usefulness_engine::embedding::Embedder;
use usefulness_engine::memory::SignalType;

#[tokio::test]
async fn single_used_signal_lands_at_point_six() {
    let h = Harness::new().await;

    let outcome = h
        .signals
        .apply_signal("bank-a", "fact-1", "how do I configure retries", SignalType::Used, 1.0, None)
        .await
        .expect("apply_signal");

    assert!(outcome.created_new_context);
    assert!((outcome.new_score - 0.6).abs() < 1e-5, "got {}", outcome.new_score);
    assert_eq!(outcome.signal_count, 1);
}

#[tokio::test]
async fn single_helpful_signal_lands_at_point_six_five() {
    let h = Harness::new().await;

    let outcome = h
        .signals
        .apply_signal("bank-a", "fact-1", "explain the retry policy", SignalType::Helpful, 1.0, None)
        .await
        .expect("apply_signal");

    assert!(outcome.created_new_context);
    assert!((outcome.new_score - 0.65).abs() < 1e-5, "got {}", outcome.new_score);
}

#[tokio::test]
async fn repeated_helpful_signals_on_same_query_merge_and_clamp() {
    let h = Harness::new().await;
    let query = "what is the retry backoff formula";

    let first = h
        .signals
        .apply_signal("bank-a", "fact-1", query, SignalType::Helpful, 1.0, None)
        .await
        .expect("first signal");
    assert!(first.created_new_context);
    assert!((first.new_score - 0.65).abs() < 1e-5);

    let second = h
        .signals
        .apply_signal("bank-a", "fact-1", query, SignalType::Helpful, 1.0, None)
        .await
        .expect("second signal");
    assert!(!second.created_new_context, "identical query should merge");
    assert!((second.new_score - 0.80).abs() < 1e-5, "got {}", second.new_score);
    assert_eq!(second.signal_count, 2);

    let mut last_score = second.new_score;
    for _ in 0..8 {
        let outcome = h
            .signals
            .apply_signal("bank-a", "fact-1", query, SignalType::Helpful, 1.0, None)
            .await
            .expect("subsequent signal");
        last_score = outcome.new_score;
    }
    assert!((last_score - 1.0).abs() < 1e-6, "score should clamp at 1.0, got {last_score}");
}

#[tokio::test]
async fn distinct_queries_create_separate_contexts() {
    let h = Harness::new().await;

    h.signals
        .apply_signal("bank-a", "fact-1", "how do retries work", SignalType::Helpful, 1.0, None)
        .await
        .expect("first signal");
    h.signals
        .apply_signal(
            "bank-a",
            "fact-1",
            "completely unrelated topic about shipping logistics",
            SignalType::Helpful,
            1.0,
            None,
        )
        .await
        .expect("second signal");

    let stats = h.stats.fact_stats("bank-a", "fact-1").await.expect("fact stats");
    assert_eq!(stats.contexts.len(), 2);
    assert_eq!(stats.signal_count, 2);
}

#[tokio::test]
async fn not_helpful_signal_pulls_score_down() {
    let h = Harness::new().await;

    let outcome = h
        .signals
        .apply_signal("bank-a", "fact-2", "does this even work", SignalType::NotHelpful, 1.0, None)
        .await
        .expect("apply_signal");

    assert!(outcome.new_score < 0.5);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let h = Harness::new().await;

    let result = h
        .signals
        .apply_signal("bank-a", "fact-3", "   ", SignalType::Used, 1.0, None)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn out_of_range_confidence_is_rejected() {
    let h = Harness::new().await;

    let result = h
        .signals
        .apply_signal("bank-a", "fact-3", "a valid query", SignalType::Used, 1.5, None)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn unknown_fact_is_rejected() {
    let h = Harness::new().await;

    let facts: std::sync::Arc<dyn usefulness_engine::fact_registry::FactRegistry> =
        std::sync::Arc::new(AbsentRegistry);
    let ingestor = usefulness_engine::memory::SignalIngestor::new(
        h.store.clone(),
        h.embedder.clone(),
        facts,
        h.config.clone(),
    );

    let result = ingestor
        .apply_signal("bank-a", "ghost-fact", "a valid query", SignalType::Used, 1.0, None)
        .await;

    assert!(matches!(result, Err(usefulness_engine::error::CoreError::UnknownFact(_))));
}

#[tokio::test]
async fn dissimilar_queries_below_theta_merge_create_separate_contexts() {
    // theta_merge defaults to 0.85; cos(60 degrees) = 0.5 sits well below it,
    // so two differently-worded queries about the same fact should land in
    // two distinct contexts rather than merging.
    let query_a = "how do retries work for this endpoint";
    let query_b = "what happens when a request times out and is retried";
    let embedder: Arc<dyn Embedder> = Arc::new(
        ScriptedEmbedder::new()
            .with(query_a, angled_vector(0.0))
            .with(query_b, angled_vector(60.0)),
    );
    let h = Harness::with_embedder(EngineConfig::default(), embedder).await;

    h.signals
        .apply_signal("bank-a", "fact-1", query_a, SignalType::Helpful, 1.0, None)
        .await
        .expect("first signal");
    let second = h
        .signals
        .apply_signal("bank-a", "fact-1", query_b, SignalType::Helpful, 1.0, None)
        .await
        .expect("second signal");

    assert!(second.created_new_context, "dissimilar queries should not merge");
    let stats = h.stats.fact_stats("bank-a", "fact-1").await.expect("fact stats");
    assert_eq!(stats.contexts.len(), 2);
    for context in &stats.contexts {
        assert!((context.usefulness_score - 0.65).abs() < 1e-5, "got {}", context.usefulness_score);
    }
}

#[tokio::test]
async fn similar_queries_above_theta_merge_consolidate_into_one_context() {
    // cos(10 degrees) ~= 0.9848, above the 0.85 theta_merge threshold, so two
    // differently-worded but semantically-close queries should merge into a
    // single context rather than creating a second one.
    let query_a = "how do I reset my account password";
    let query_b = "steps to change my password for this account";
    let embedder: Arc<dyn Embedder> = Arc::new(
        ScriptedEmbedder::new()
            .with(query_a, angled_vector(0.0))
            .with(query_b, angled_vector(10.0)),
    );
    let h = Harness::with_embedder(EngineConfig::default(), embedder).await;

    let first = h
        .signals
        .apply_signal("bank-a", "fact-1", query_a, SignalType::Helpful, 1.0, None)
        .await
        .expect("first signal");
    let second = h
        .signals
        .apply_signal("bank-a", "fact-1", query_b, SignalType::Helpful, 1.0, None)
        .await
        .expect("second signal");

    assert!(!second.created_new_context, "similar queries should merge");
    assert_eq!(second.context_id, first.context_id);
    assert!((second.new_score - 0.80).abs() < 1e-5, "got {}", second.new_score);
    assert_eq!(second.signal_count, 2);

    let stats = h.stats.fact_stats("bank-a", "fact-1").await.expect("fact stats");
    assert_eq!(stats.contexts.len(), 1);
}

struct AbsentRegistry;

#[async_trait::async_trait]
impl usefulness_engine::fact_registry::FactRegistry for AbsentRegistry {
    async fn exists(&self, _bank_id: &str, _fact_id: &str) -> bool {
        false
    }
}
