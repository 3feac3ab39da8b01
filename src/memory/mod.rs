// src/memory/mod.rs
// The usefulness engine: learned per-context scores layered over recall.

pub mod core;
pub mod decay;
pub mod recall;
pub mod signal;
pub mod stats;
pub mod store;

pub use core::{
    BankStats, ContextSummary, FactStats, FactUsefulness, QueryContextScore, Signal,
    SignalOutcome, SignalType,
};
pub use decay::{decay, Decayer, DecaySweepStats};
pub use recall::{BoostedScore, RecallBooster, RecallOptions};
pub use signal::SignalIngestor;
pub use stats::StatsAggregator;
pub use store::{NearestMatch, ScoreStore, SqliteScoreStore};
