//! Query embeddings over an OpenAI-compatible `/embeddings` endpoint.
//!
//! The index is built offline with the same model; only queries are
//! embedded at request time. No retries here: a failed embedding fails the
//! chat request and the caller decides whether to try again.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::RetrievalError;
use crate::config::env_parse;

pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Turns text into a dense vector.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`RetrievalError`] if the provider call fails or returns
    /// something other than exactly one vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// Build typed embedding config from environment variables.
    ///
    /// - `EMBEDDING_API_KEY_ENV`: names the env var holding the key (default `OPENAI_API_KEY`)
    /// - `EMBEDDING_MODEL`: default `text-embedding-3-small`
    /// - `EMBEDDING_BASE_URL`: default OpenAI API base URL
    /// - `EMBEDDING_TIMEOUT_SECS`: default 30
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::MissingApiKey`] if the named key var is unset.
    pub fn from_env() -> Result<Self, RetrievalError> {
        let key_var = std::env::var("EMBEDDING_API_KEY_ENV").unwrap_or_else(|_| DEFAULT_EMBEDDING_KEY_ENV.to_string());
        let api_key = std::env::var(&key_var).map_err(|_| RetrievalError::MissingApiKey { var: key_var.clone() })?;
        let model = std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
        let base_url = std::env::var("EMBEDDING_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = env_parse("EMBEDDING_TIMEOUT_SECS", DEFAULT_EMBEDDING_TIMEOUT_SECS);
        Ok(Self { api_key, model, base_url, timeout_secs })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiEmbedder {
    /// # Errors
    ///
    /// Returns [`RetrievalError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: EmbeddingConfig) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| RetrievalError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key, model: config.model, base_url: config.base_url })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest { model: &self.model, input: [text] };
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::EmbeddingRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RetrievalError::EmbeddingRequest(e.to_string()))?;
        if status != 200 {
            return Err(RetrievalError::EmbeddingResponse { status, body: text });
        }

        let mut vectors = parse_embeddings_response(&text)?;
        if vectors.len() != 1 {
            return Err(RetrievalError::EmbeddingParse(format!("expected 1 embedding, got {}", vectors.len())));
        }
        Ok(vectors.swap_remove(0))
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Extract `data[].embedding` vectors, ordered by their `index` field.
pub(crate) fn parse_embeddings_response(json_text: &str) -> Result<Vec<Vec<f32>>, RetrievalError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| RetrievalError::EmbeddingParse(e.to_string()))?;
    let Some(data) = root.get("data").and_then(Value::as_array) else {
        return Err(RetrievalError::EmbeddingParse("missing data array".to_string()));
    };

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let Some(values) = item.get("embedding").and_then(Value::as_array) else {
            return Err(RetrievalError::EmbeddingParse(format!("data[{position}] missing embedding")));
        };
        let mut vector = Vec::with_capacity(values.len());
        for value in values {
            let Some(component) = value.as_f64() else {
                return Err(RetrievalError::EmbeddingParse(format!("data[{position}] has a non-numeric component")));
            };
            #[allow(clippy::cast_possible_truncation)]
            vector.push(component as f32);
        }
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .unwrap_or(position as u64);
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
#[path = "embedding_test.rs"]
mod tests;
