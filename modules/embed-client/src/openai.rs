use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use tastemap_common::EngineError;

use crate::Embedder;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI-style `/embeddings` client.
pub struct OpenAiEmbedder {
    api_key: String,
    model: String,
    dim: usize,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, model: &str, dim: usize) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            dim,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build embeddings HTTP client"),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| EngineError::Config(format!("Bad API key header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn request(&self, input: serde_json::Value) -> Result<Vec<Vec<f32>>, EngineError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::ProviderTransient(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ProviderPermanent(format!("Bad embeddings body: {e}")))?;

        let mut vectors: Vec<(usize, Vec<f32>)> = data
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect();
        // The API documents response order as matching input order, but the
        // index field is authoritative.
        vectors.sort_by_key(|(i, _)| *i);

        let vectors: Vec<Vec<f32>> = vectors.into_iter().map(|(_, v)| v).collect();
        for v in &vectors {
            if v.len() != self.dim {
                return Err(EngineError::DimensionMismatch {
                    expected: self.dim,
                    actual: v.len(),
                });
            }
        }
        Ok(vectors)
    }
}

fn classify_status(status: StatusCode, body: String) -> EngineError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        EngineError::ProviderTransient(format!("Embeddings API {status}: {body}"))
    } else {
        EngineError::ProviderPermanent(format!("Embeddings API {status}: {body}"))
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        debug!(model = self.model.as_str(), "Embedding single text");
        let vectors = self
            .request(serde_json::Value::String(text.to_string()))
            .await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::ProviderPermanent("No embedding in response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            model = self.model.as_str(),
            count = texts.len(),
            "Embedding batch"
        );
        let input = serde_json::Value::Array(
            texts
                .iter()
                .map(|t| serde_json::Value::String(t.clone()))
                .collect(),
        );
        let vectors = self.request(input).await?;
        if vectors.len() != texts.len() {
            return Err(EngineError::ProviderPermanent(format!(
                "Embedding count mismatch: sent {}, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_transient());
    }

    #[test]
    fn bad_request_is_permanent() {
        assert!(!classify_status(StatusCode::BAD_REQUEST, String::new()).is_transient());
    }
}
