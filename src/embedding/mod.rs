//! Embedding provider
//!
//! Maps batches of text to fixed-dimension vectors, one per input, in
//! order. Implementations are loaded once and shared read-only through
//! [`SharedEmbedder`]; inference must be safe to call from several threads.

pub mod engine;
pub mod hash;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::errors::{LexError, Result};

pub use engine::CandleEmbedder;
pub use hash::HashEmbedder;

/// Text → dense vector capability
pub trait Embedder: Send + Sync {
    /// Model identifier, recorded in the build manifest
    fn model_id(&self) -> &str;

    /// Length of every produced vector
    fn dimension(&self) -> usize;

    /// Embed a batch; output order matches input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| LexError::EmbeddingUnavailable("empty embedding result".to_string()))
    }
}

/// Process-wide embedder handle injected into the builder and retriever
pub type SharedEmbedder = Arc<dyn Embedder>;

/// Which embedding implementation to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Pretrained encoder run locally with Candle
    Candle,
    /// Deterministic feature hashing, no model download
    Hash,
}

/// Load the configured embedder. Call once per process.
pub fn load_embedder(config: &EmbeddingConfig) -> Result<SharedEmbedder> {
    match config.backend {
        EmbeddingBackend::Candle => Ok(Arc::new(CandleEmbedder::load(
            &config.model_id,
            config.max_seq_len,
        )?)),
        EmbeddingBackend::Hash => Ok(Arc::new(HashEmbedder::new(config.hash_dimension))),
    }
}

/// Embed `texts` in batches of `batch_size`, checking that every batch
/// returns one vector of the embedder's dimension per input.
/// `on_batch` receives the number of texts completed so far.
pub fn embed_batched(
    embedder: &dyn Embedder,
    texts: &[&str],
    batch_size: usize,
    mut on_batch: impl FnMut(usize),
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let dimension = embedder.dimension();
    let mut vectors = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size) {
        let embedded = embedder.embed_batch(batch)?;
        if embedded.len() != batch.len() {
            return Err(LexError::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} texts",
                embedded.len(),
                batch.len()
            )));
        }
        if let Some(bad) = embedded.iter().find(|v| v.len() != dimension) {
            return Err(LexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        vectors.extend(embedded);
        debug!(done = vectors.len(), total = texts.len(), "Embedded batch");
        on_batch(vectors.len());
    }

    Ok(vectors)
}
