// src/config/engine.rs
// Tunables for the usefulness engine itself (spec section 6 env vars).

use serde::{Deserialize, Serialize};

use super::helpers::{env_f32, env_u64, env_usize};

/// Fixed embedding dimensionality. Not configurable at runtime: changing it
/// requires re-embedding every stored context, so it is a compile-time
/// constant rather than an env var.
pub const EMBEDDING_DIM: usize = 384;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cosine similarity above which a signal's query embedding is folded
    /// into an existing context instead of creating a new one.
    pub theta_merge: f32,
    /// Learning rate applied to every signal's score delta.
    pub learning_rate: f32,
    /// Per-day decay rate pulling scores toward neutral 0.5.
    pub decay_lambda_per_day: f32,
    /// Default usefulness_weight used by RecallBooster when the caller omits it.
    pub default_usefulness_weight: f32,
    /// Interval between background decay sweeps.
    pub sweep_interval_seconds: u64,
    /// Max in-flight `apply_signal` calls per bank before `Busy` is returned.
    pub max_inflight_signals_per_bank: usize,
    /// Retry budget for optimistic-concurrency conflicts in ScoreStore::update.
    pub max_store_retries: usize,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            theta_merge: env_f32("THETA_MERGE", 0.85),
            learning_rate: env_f32("LEARNING_RATE", 0.1),
            decay_lambda_per_day: env_f32("DECAY_LAMBDA_PER_DAY", 0.01),
            default_usefulness_weight: env_f32("DEFAULT_USEFULNESS_WEIGHT", 0.3),
            sweep_interval_seconds: env_u64("SWEEP_INTERVAL_SECONDS", 3600),
            max_inflight_signals_per_bank: env_usize("MAX_INFLIGHT_SIGNALS_PER_BANK", 64),
            max_store_retries: env_usize("MAX_STORE_RETRIES", 3),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            theta_merge: 0.85,
            learning_rate: 0.1,
            decay_lambda_per_day: 0.01,
            default_usefulness_weight: 0.3,
            sweep_interval_seconds: 3600,
            max_inflight_signals_per_bank: 64,
            max_store_retries: 3,
        }
    }
}
