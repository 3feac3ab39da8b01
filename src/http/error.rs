// src/http/error.rs
// Maps CoreError onto HTTP status codes and a uniform JSON error body
// (spec section 7's Validation/NotFound/Conflict/Upstream/Invariant taxonomy).

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::CoreError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorBody,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: kind.to_string(),
                message: message.into(),
            },
            retry_after_secs: None,
        }
    }

    fn retriable(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            // Validation: client error, non-retriable. HTTP 422.
            CoreError::InvalidSignalType(_)
            | CoreError::ConfidenceOutOfRange(_)
            | CoreError::MissingQuery
            | CoreError::InvalidWeight(_)
            | CoreError::EmptySignalBatch => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", err.to_string())
            }
            // NotFound: unknown fact, or stats for a fact with no signals. HTTP 404.
            CoreError::UnknownFact(_) | CoreError::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            // Conflict: optimistic-concurrency exhaustion. HTTP 409, client may retry.
            CoreError::StoreConflict(_) => {
                ApiError::new(StatusCode::CONFLICT, "conflict", err.to_string())
            }
            // Upstream: embedder or store failure. HTTP 503 with Retry-After.
            CoreError::EmbedFailed(_) | CoreError::StoreUnavailable(_) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "upstream", err.to_string()).retriable(1)
            }
            // Backpressure: not in spec.md's taxonomy directly, but "queue full
            // yields Busy" (section 5) maps naturally onto 429.
            CoreError::Busy(_) => {
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, "busy", err.to_string()).retriable(1)
            }
            // Invariant violation: a bug. Log and fail, never silently clamp. HTTP 500.
            CoreError::Invariant(_) => {
                tracing::error!(error = %err, "invariant violation");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Convenience trait mirroring `Result::map_err(Into::into)` for handlers
/// that want `?` to reach for `ApiError` without an explicit turbofish.
pub trait IntoApiError<T> {
    fn into_api(self) -> ApiResult<T>;
}

impl<T> IntoApiError<T> for Result<T, CoreError> {
    fn into_api(self) -> ApiResult<T> {
        self.map_err(ApiError::from)
    }
}
