// src/memory/core/types.rs
// Core value types shared across the usefulness engine (spec section 3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embedding::Embedding;
use crate::error::CoreError;

/// Kind of feedback a caller reports after acting on a retrieved fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Used,
    Helpful,
    Ignored,
    NotHelpful,
}

impl SignalType {
    pub const ALL: [SignalType; 4] = [
        SignalType::Used,
        SignalType::Helpful,
        SignalType::Ignored,
        SignalType::NotHelpful,
    ];

    /// Raw score delta contribution before the learning rate is applied.
    pub fn weight(&self) -> f32 {
        match self {
            SignalType::Used => 1.0,
            SignalType::Helpful => 1.5,
            SignalType::Ignored => -0.5,
            SignalType::NotHelpful => -1.0,
        }
    }

    /// True for signal kinds that can only ever raise a score, used by the
    /// "monotone response to positive signal" invariant.
    pub fn is_positive(&self) -> bool {
        matches!(self, SignalType::Used | SignalType::Helpful)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Used => "used",
            SignalType::Helpful => "helpful",
            SignalType::Ignored => "ignored",
            SignalType::NotHelpful => "not_helpful",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "used" => Ok(SignalType::Used),
            "helpful" => Ok(SignalType::Helpful),
            "ignored" => Ok(SignalType::Ignored),
            "not_helpful" => Ok(SignalType::NotHelpful),
            other => Err(CoreError::invalid_signal_type(other)),
        }
    }
}

/// An audit entry recording one piece of feedback against a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub bank_id: String,
    pub fact_id: String,
    pub signal_type: SignalType,
    pub confidence: f32,
    pub query: Option<String>,
    pub context_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single persisted query-context score for a `(bank_id, fact_id)` pair:
/// one centroid embedding plus the running usefulness score for signals that
/// cluster near it (spec section 3's `QueryContextScore`).
#[derive(Debug, Clone, Serialize)]
pub struct QueryContextScore {
    pub id: Uuid,
    pub bank_id: String,
    pub fact_id: String,
    #[serde(skip)]
    pub embedding: Embedding,
    /// A representative query string, kept only for debugging/UI; never used
    /// in ranking or merge decisions.
    pub query_example: Option<String>,
    pub usefulness_score: f32,
    pub signal_count: u64,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub last_decay_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueryContextScore {
    pub fn new(bank_id: String, fact_id: String, embedding: Embedding, query_example: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bank_id,
            fact_id,
            embedding,
            query_example,
            usefulness_score: 0.5,
            signal_count: 0,
            last_signal_at: None,
            last_decay_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of applying a single signal to a context (spec section 6's
/// `UpdatedScore`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub context_id: Uuid,
    pub fact_id: String,
    pub previous_score: f32,
    pub new_score: f32,
    pub signal_count: u64,
    pub created_new_context: bool,
}

/// One context's contribution to a fact's stats listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub query_example: Option<String>,
    pub usefulness_score: f32,
    pub signal_count: u64,
}

/// Per-fact usefulness roll-up (spec section 4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactStats {
    pub fact_id: String,
    /// Mean of context scores weighted by each context's `signal_count`.
    pub usefulness_score: f32,
    pub signal_count: u64,
    pub signal_breakdown: HashMap<SignalType, u64>,
    pub contexts: Vec<ContextSummary>,
    pub created_at: DateTime<Utc>,
}

/// A fact's usefulness within a bank-level top/least-useful listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactUsefulness {
    pub fact_id: String,
    pub usefulness_score: f32,
}

/// Per-bank usefulness roll-up (spec section 4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankStats {
    pub bank_id: String,
    pub total_facts_with_signals: u64,
    pub total_signals: u64,
    pub signal_distribution: HashMap<SignalType, u64>,
    pub average_usefulness: f32,
    pub top_useful_facts: Vec<FactUsefulness>,
    pub least_useful_facts: Vec<FactUsefulness>,
}
