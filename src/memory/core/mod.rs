// src/memory/core/mod.rs
// Core domain types, independent of storage or transport.

pub mod types;

pub use types::{
    BankStats, ContextSummary, FactStats, FactUsefulness, QueryContextScore, Signal,
    SignalOutcome, SignalType,
};
