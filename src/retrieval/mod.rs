//! Retrieval — knowledge-store seam and the grounding decision.
//!
//! DESIGN
//! ======
//! `KnowledgeStore` is the only capability the pipeline needs from the
//! corpus: `search(query, k)` returning passages ordered by relevance.
//! `RetrievalGate` wraps a store and decides whether the best match is
//! strong enough to justify a completion call.
//!
//! TRADE-OFFS
//! ==========
//! The relevance threshold favors declining over answering from weakly
//! related passages. It is a tunable (`RELEVANCE_THRESHOLD`) with an
//! inclusive boundary: a top score equal to the threshold is grounded.

pub mod embedding;
pub mod index;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::env_parse;
use crate::error::ErrorCode;

pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_RETRIEVAL_K: usize = 3;

/// Separator placed between passages in the assembled context.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The index file could not be read or is structurally invalid.
    #[error("index load failed: {0}")]
    IndexLoad(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the embeddings provider failed.
    #[error("embedding request failed: {0}")]
    EmbeddingRequest(String),

    /// The embeddings provider returned a non-success HTTP status.
    #[error("embedding response error: status {status}")]
    EmbeddingResponse { status: u16, body: String },

    /// The embeddings response body could not be interpreted.
    #[error("embedding response parse failed: {0}")]
    EmbeddingParse(String),

    /// Query vector and index vectors have different lengths.
    #[error("embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for RetrievalError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::IndexLoad(_) => "E_INDEX_LOAD",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::EmbeddingRequest(_) => "E_EMBEDDING_REQUEST",
            Self::EmbeddingResponse { .. } => "E_EMBEDDING_RESPONSE",
            Self::EmbeddingParse(_) => "E_EMBEDDING_PARSE",
            Self::DimensionMismatch { .. } => "E_DIMENSION_MISMATCH",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::EmbeddingRequest(_) | Self::EmbeddingResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// STORE SEAM
// =============================================================================

/// A passage returned by a knowledge-store search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub text: String,
    /// Relevance in `[0, 1]`, higher is better.
    pub score: f32,
}

/// Nearest-neighbor search over a fixed corpus.
///
/// Implementations return at most `k` passages, highest score first, and
/// must be free of side effects.
#[async_trait::async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`RetrievalError`] if the backing index or embedder fails.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, RetrievalError>;
}

// =============================================================================
// GATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    /// Minimum top score for an answer to be attempted (inclusive).
    pub threshold: f32,
    /// Number of passages requested per search.
    pub k: usize,
}

impl RetrievalConfig {
    /// Read `RELEVANCE_THRESHOLD` and `RETRIEVAL_K`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            threshold: env_parse("RELEVANCE_THRESHOLD", DEFAULT_RELEVANCE_THRESHOLD),
            k: env_parse("RETRIEVAL_K", DEFAULT_RETRIEVAL_K),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { threshold: DEFAULT_RELEVANCE_THRESHOLD, k: DEFAULT_RETRIEVAL_K }
    }
}

/// Outcome of the grounding decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grounding {
    /// Passages joined with [`CONTEXT_DELIMITER`], best first.
    Grounded(String),
    Ungrounded,
}

pub struct RetrievalGate {
    store: Arc<dyn KnowledgeStore>,
    config: RetrievalConfig,
}

impl RetrievalGate {
    #[must_use]
    pub fn new(store: Arc<dyn KnowledgeStore>, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    /// Search the store and decide whether the results ground an answer.
    ///
    /// # Errors
    ///
    /// Propagates store failures unchanged; the caller decides how they surface.
    pub async fn resolve_context(&self, query: &str) -> Result<Grounding, RetrievalError> {
        let mut results = self.store.search(query, self.config.k).await?;
        results.truncate(self.config.k);

        let Some(top) = results.first() else {
            info!("retrieval: no passages returned");
            return Ok(Grounding::Ungrounded);
        };
        // NaN and infinite scores come from broken stores; never ground on them.
        if !top.score.is_finite() || top.score < self.config.threshold {
            info!(top_score = top.score, threshold = self.config.threshold, "retrieval: below threshold");
            return Ok(Grounding::Ungrounded);
        }

        debug!(passages = results.len(), top_score = top.score, "retrieval: grounded");
        Ok(Grounding::Grounded(join_passages(&results)))
    }
}

fn join_passages(results: &[ScoredPassage]) -> String {
    results
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
