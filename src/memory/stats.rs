// src/memory/stats.rs
// StatsAggregator: roll per-context scores and audit signals up into
// fact- and bank-level summaries (spec section 4.F).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::memory::core::{BankStats, ContextSummary, FactStats, FactUsefulness, SignalType};
use crate::memory::store::ScoreStore;

const TOP_N: usize = 10;

pub struct StatsAggregator {
    store: Arc<dyn ScoreStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self { store }
    }

    /// Aggregate usefulness across every context recorded for one fact:
    /// signal-count-weighted mean score, a breakdown of signal kinds, and
    /// the raw per-context listing.
    pub async fn fact_stats(&self, bank_id: &str, fact_id: &str) -> CoreResult<FactStats> {
        let contexts = self.store.list_by_fact(bank_id, fact_id).await?;
        if contexts.is_empty() {
            return Err(CoreError::NotFound(fact_id.to_string()));
        }

        let total_signal_count: u64 = contexts.iter().map(|c| c.signal_count).sum();
        let usefulness_score = if total_signal_count == 0 {
            contexts.iter().map(|c| c.usefulness_score).sum::<f32>() / contexts.len() as f32
        } else {
            contexts
                .iter()
                .map(|c| c.usefulness_score * c.signal_count as f32)
                .sum::<f32>()
                / total_signal_count as f32
        };

        let created_at: DateTime<Utc> = contexts.iter().map(|c| c.created_at).min().unwrap_or_else(Utc::now);

        let signals = self.store.list_signals_by_fact(bank_id, fact_id).await?;
        let signal_breakdown = count_by_type(&signals);

        let contexts_summary = contexts
            .iter()
            .map(|c| ContextSummary {
                query_example: c.query_example.clone(),
                usefulness_score: c.usefulness_score,
                signal_count: c.signal_count,
            })
            .collect();

        Ok(FactStats {
            fact_id: fact_id.to_string(),
            usefulness_score,
            signal_count: total_signal_count,
            signal_breakdown,
            contexts: contexts_summary,
            created_at,
        })
    }

    /// Aggregate usefulness across every fact recorded anywhere in a bank.
    pub async fn bank_stats(&self, bank_id: &str) -> CoreResult<BankStats> {
        let contexts = self.store.list_by_bank(bank_id).await?;
        let signals = self.store.list_signals_by_bank(bank_id).await?;

        let mut per_fact: HashMap<&str, (f32, u64)> = HashMap::new();
        for context in &contexts {
            let entry = per_fact.entry(context.fact_id.as_str()).or_insert((0.0, 0));
            entry.0 += context.usefulness_score * context.signal_count.max(1) as f32;
            entry.1 += context.signal_count.max(1);
        }

        let mut fact_scores: Vec<FactUsefulness> = per_fact
            .into_iter()
            .map(|(fact_id, (weighted_sum, weight))| FactUsefulness {
                fact_id: fact_id.to_string(),
                usefulness_score: weighted_sum / weight as f32,
            })
            .collect();

        let total_facts_with_signals = fact_scores.len() as u64;
        let total_signals = signals.len() as u64;
        let average_usefulness = if fact_scores.is_empty() {
            0.5
        } else {
            fact_scores.iter().map(|f| f.usefulness_score).sum::<f32>() / fact_scores.len() as f32
        };

        fact_scores.sort_by(|a, b| b.usefulness_score.partial_cmp(&a.usefulness_score).unwrap());
        let top_useful_facts = fact_scores.iter().take(TOP_N).cloned().collect();

        fact_scores.sort_by(|a, b| a.usefulness_score.partial_cmp(&b.usefulness_score).unwrap());
        let least_useful_facts = fact_scores.iter().take(TOP_N).cloned().collect();

        Ok(BankStats {
            bank_id: bank_id.to_string(),
            total_facts_with_signals,
            total_signals,
            signal_distribution: count_by_type(&signals),
            average_usefulness,
            top_useful_facts,
            least_useful_facts,
        })
    }
}

fn count_by_type(signals: &[crate::memory::core::Signal]) -> HashMap<SignalType, u64> {
    let mut counts: HashMap<SignalType, u64> = SignalType::ALL.iter().map(|t| (*t, 0)).collect();
    for signal in signals {
        *counts.entry(signal.signal_type).or_insert(0) += 1;
    }
    counts
}
