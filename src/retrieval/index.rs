//! In-memory vector index loaded from a prebuilt JSON file.
//!
//! File shape (written by the offline ingestion job):
//!
//! ```json
//! { "model": "text-embedding-3-small",
//!   "passages": [ { "id": "faq-12", "text": "...", "embedding": [0.01, ...] } ] }
//! ```
//!
//! Search is brute-force cosine similarity over every passage. Corpus size
//! is small and fixed, so no ANN structure is kept.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::embedding::Embedder;
use super::{KnowledgeStore, RetrievalError, ScoredPassage};

#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(default)]
    model: Option<String>,
    passages: Vec<IndexedPassage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexedPassage {
    pub text: String,
    pub embedding: Vec<f32>,
}

pub struct VectorIndex {
    passages: Vec<IndexedPassage>,
    dims: usize,
    model: Option<String>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("passages", &self.passages.len())
            .field("dims", &self.dims)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Read and validate an index file.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::IndexLoad`] if the file is unreadable, not
    /// valid JSON, empty, or has inconsistent embedding dimensions.
    pub async fn load(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, RetrievalError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RetrievalError::IndexLoad(format!("{}: {e}", path.display())))?;
        let file: IndexFile =
            serde_json::from_str(&raw).map_err(|e| RetrievalError::IndexLoad(format!("{}: {e}", path.display())))?;
        let index = Self::from_passages(file.passages, file.model, embedder)?;
        info!(path = %path.display(), passages = index.passage_count(), dims = index.dims, "index: loaded");
        Ok(index)
    }

    /// Build an index from passages already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::IndexLoad`] if there are no passages or the
    /// embeddings do not share one non-zero dimension.
    pub fn from_passages(
        passages: Vec<IndexedPassage>,
        model: Option<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, RetrievalError> {
        let Some(first) = passages.first() else {
            return Err(RetrievalError::IndexLoad("index has no passages".to_string()));
        };
        let dims = first.embedding.len();
        if dims == 0 {
            return Err(RetrievalError::IndexLoad("passage embeddings are empty".to_string()));
        }
        if let Some((pos, bad)) = passages
            .iter()
            .enumerate()
            .find(|(_, p)| p.embedding.len() != dims)
        {
            return Err(RetrievalError::IndexLoad(format!(
                "passage {pos} has {} dimensions, expected {dims}",
                bad.embedding.len()
            )));
        }
        Ok(Self { passages, dims, model, embedder })
    }

    #[must_use]
    pub fn passage_count(&self) -> usize {
        self.passages.len()
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Rank every passage against `query_vec`, best first, keeping `k`.
    pub(crate) fn rank(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        if query_vec.len() != self.dims {
            return Err(RetrievalError::DimensionMismatch { expected: self.dims, actual: query_vec.len() });
        }
        let mut scored: Vec<ScoredPassage> = self
            .passages
            .iter()
            .map(|p| ScoredPassage { text: p.text.clone(), score: relevance(query_vec, &p.embedding) })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait::async_trait]
impl KnowledgeStore for VectorIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        let query_vec = self.embedder.embed(query).await?;
        self.rank(&query_vec, k)
    }
}

// =============================================================================
// SIMILARITY
// =============================================================================

/// Cosine similarity between two vectors; `0.0` for empty, mismatched, or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Cosine similarity clamped into `[0, 1]`; opposed vectors count as unrelated.
fn relevance(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "index_test.rs"]
mod tests;
