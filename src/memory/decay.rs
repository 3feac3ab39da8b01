// src/memory/decay.rs
// Exponential decay of usefulness scores toward neutral (spec section 4.D).

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::memory::store::ScoreStore;

const NEUTRAL_SCORE: f32 = 0.5;

/// Decays `score` toward `NEUTRAL_SCORE` as a function of elapsed time since
/// `last_decay_at`. A context that has never decayed (`now == last_decay_at`)
/// returns its score unchanged. Applying this twice in immediate succession
/// (`Δt = 0` between calls) is a near no-op, bounded by floating-point error.
pub fn decay(score: f32, last_decay_at: DateTime<Utc>, now: DateTime<Utc>, lambda_per_day: f32) -> f32 {
    let elapsed_days = (now - last_decay_at).num_seconds().max(0) as f32 / 86_400.0;
    NEUTRAL_SCORE + (score - NEUTRAL_SCORE) * (-lambda_per_day * elapsed_days).exp()
}

#[derive(Debug, Clone, Default)]
pub struct DecaySweepStats {
    pub banks_swept: u64,
    pub contexts_touched: u64,
}

/// Periodically rewrites stale contexts' scores across every known bank.
pub struct Decayer {
    store: Arc<dyn ScoreStore>,
    lambda_per_day: f32,
    interval: Duration,
}

impl Decayer {
    pub fn new(store: Arc<dyn ScoreStore>, lambda_per_day: f32, sweep_interval_seconds: u64) -> Self {
        Self {
            store,
            lambda_per_day,
            interval: Duration::from_secs(sweep_interval_seconds),
        }
    }

    /// One full decay pass over every bank. Returns the per-sweep totals.
    /// Banks are swept concurrently since `apply_decay_sweep` on one bank
    /// touches only that bank's rows.
    pub async fn sweep_once(&self) -> Result<DecaySweepStats, CoreError> {
        let now = Utc::now();
        let bank_ids = self.store.list_bank_ids().await?;
        let mut stats = DecaySweepStats::default();

        let sweeps = bank_ids.into_iter().map(|bank_id| {
            let store = self.store.clone();
            let lambda_per_day = self.lambda_per_day;
            async move {
                let result = store.apply_decay_sweep(&bank_id, lambda_per_day, now).await;
                (bank_id, result)
            }
        });

        for (bank_id, result) in futures::future::join_all(sweeps).await {
            match result {
                Ok(touched) => {
                    stats.banks_swept += 1;
                    stats.contexts_touched += touched;
                }
                Err(e) => warn!(bank_id, error = %e, "decay sweep failed for bank"),
            }
        }

        info!(
            banks_swept = stats.banks_swept,
            contexts_touched = stats.contexts_touched,
            "decay sweep complete"
        );
        Ok(stats)
    }

    /// Spawns the background sweep loop. Stops when `cancel` is triggered.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {
                        if let Err(e) = self.sweep_once().await {
                            warn!(error = %e, "decay sweep errored");
                        }
                    }
                }
            }
        });
    }
}
