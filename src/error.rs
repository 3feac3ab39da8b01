// src/error.rs
// Error taxonomy for the usefulness engine (spec section 7).

use thiserror::Error;

/// Core error type returned by every public operation in this crate.
///
/// Each variant maps to exactly one response class at the HTTP boundary
/// (see `http::error`): Validation/NotFound/Conflict are client-facing,
/// Upstream is retriable, Invariant is a bug.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid signal type: {0}")]
    InvalidSignalType(String),

    #[error("confidence out of range: {0}")]
    ConfidenceOutOfRange(f32),

    #[error("query text is required")]
    MissingQuery,

    #[error("usefulness_weight must be in [0,1]: {0}")]
    InvalidWeight(f32),

    #[error("signals must be non-empty")]
    EmptySignalBatch,

    #[error("fact not found: {0}")]
    UnknownFact(String),

    #[error("no signals recorded for fact: {0}")]
    NotFound(String),

    #[error("store conflict after retries for context {0}")]
    StoreConflict(String),

    #[error("embedding failed: {0}")]
    EmbedFailed(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("too many in-flight signals for bank {0}")]
    Busy(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl CoreError {
    pub fn invalid_signal_type(kind: impl Into<String>) -> Self {
        Self::InvalidSignalType(kind.into())
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::EmbedFailed(_) | Self::StoreUnavailable(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
