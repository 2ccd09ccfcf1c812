//! Embedder adapter: turns query text into the 768-d unit-norm vectors the
//! vector stores are keyed by.
//!
//! The reference pipeline embeds with a SentenceTransformer behind a small
//! HTTP service (`twilog_server.py`'s sibling `embed_server.py`); this adapter
//! talks the same shape of protocol - a plain JSON POST, not an SDK.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generates an embedding for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    vector: Vec<f32>,
}

/// HTTP-backed embedder talking to the sidecar embedding process.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    dimension: usize,
}

impl HttpEmbedder {
    pub fn new(endpoint: String, timeout: Duration, max_retries: u32, dimension: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build embedder http client");

        Self {
            client,
            endpoint,
            max_retries,
            dimension,
        }
    }

    async fn request_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(text).await {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    tracing::warn!(attempt, max_retries = self.max_retries, error = %e, "embed request failed, retrying");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Embedder("no attempts made".to_string())))
    }

    async fn make_request(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embed", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| AppError::Embedder(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedder(format!("embedder returned {status}: {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedder(format!("failed to parse embedder response: {e}")))?;

        if parsed.vector.len() != self.dimension {
            return Err(AppError::Embedder(format!(
                "embedder returned {} dims, expected {}",
                parsed.vector.len(),
                self.dimension
            )));
        }

        Ok(parsed.vector)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_with_retry(text).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic embedder for tests: hashes the text into a unit vector so
/// the same input always yields the same output without a running service.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut seed: u64 = 1469598103934665603; // FNV offset basis
        for byte in text.bytes() {
            seed ^= byte as u64;
            seed = seed.wrapping_mul(1099511628211);
        }

        let mut vec = Vec::with_capacity(self.dimension);
        let mut state = seed;
        for _ in 0..self.dimension {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let v = ((state >> 33) as i64 % 2000 - 1000) as f32 / 1000.0;
            vec.push(v);
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }
        Ok(vec)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_is_deterministic_and_unit_norm() {
        let embedder = MockEmbedder::new(768);
        let a = embedder.embed("hello").await.unwrap();
        let b = embedder.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 768);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn mock_embedder_differs_by_input() {
        let embedder = MockEmbedder::new(768);
        let a = embedder.embed("hello").await.unwrap();
        let b = embedder.embed("world").await.unwrap();
        assert_ne!(a, b);
    }
}
