// src/embedding/http.rs
// HttpEmbedder: calls an external embeddings-compatible HTTP endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Embedder, Embedding};
use crate::config::server::EmbeddingConfig;
use crate::error::CoreError;

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 200;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embeds text via an OpenAI-compatible `/embeddings` HTTP endpoint, with
/// jittered exponential backoff on transient failures.
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build embedding http client"),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: EmbeddingResponse = resp
                        .json()
                        .await
                        .map_err(|e| CoreError::EmbedFailed(format!("bad response body: {e}")))?;
                    return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    warn!(status = %status, body = %text, attempt, "embedding request failed");
                    last_err = Some(CoreError::EmbedFailed(format!(
                        "embedding service returned {status}: {text}"
                    )));
                }
                Err(e) => {
                    warn!(error = %e, attempt, "embedding request error");
                    last_err = Some(CoreError::EmbedFailed(e.to_string()));
                }
            }

            if attempt + 1 < MAX_RETRIES {
                let backoff = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                let jitter = rand::random::<u64>() % (backoff / 2 + 1);
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| CoreError::EmbedFailed("exhausted retries".to_string())))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, CoreError> {
        let mut results = self.request_batch(std::slice::from_ref(&text.to_string())).await?;
        let vector = results
            .pop()
            .ok_or_else(|| CoreError::EmbedFailed("empty embedding response".to_string()))?;
        Embedding::new(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, CoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), "batch embedding request");
        let vectors = self.request_batch(texts).await?;
        vectors.into_iter().map(Embedding::new).collect()
    }
}
