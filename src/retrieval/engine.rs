//! Query-time retrieval over a loaded index artifact

use std::sync::Arc;
use tracing::debug;

use super::SearchResult;
use crate::embedding::SharedEmbedder;
use crate::errors::{LexError, Result};
use crate::index::IndexArtifact;

/// Embeds queries and resolves nearest neighbours to chunk records.
///
/// Holds only shared read-only state, so one instance can serve many
/// concurrent queries.
#[derive(Clone)]
pub struct Retriever {
    embedder: SharedEmbedder,
    artifact: Arc<IndexArtifact>,
}

impl Retriever {
    /// Pair an embedder with an artifact built by the same model
    pub fn new(embedder: SharedEmbedder, artifact: Arc<IndexArtifact>) -> Result<Self> {
        artifact.ensure_compatible(embedder.model_id(), embedder.dimension())?;
        Ok(Self { embedder, artifact })
    }

    pub fn artifact(&self) -> &IndexArtifact {
        &self.artifact
    }

    /// Top `k` chunks for `query`, ascending by distance.
    ///
    /// An empty query or `k == 0` yields no results without touching the
    /// embedder. Embedding failures surface as
    /// [`LexError::EmbeddingUnavailable`], never as an empty list.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).map_err(|e| match e {
            LexError::EmbeddingUnavailable(_) => e,
            other => LexError::EmbeddingUnavailable(other.to_string()),
        })?;

        let neighbors = self.artifact.index().search(&vector, k)?;
        let metadata = self.artifact.metadata();

        let results = neighbors
            .into_iter()
            .map(|n| {
                metadata
                    .get(n.position)
                    .map(|record| SearchResult::from_record(record, n.distance))
                    .ok_or(LexError::IndexMisaligned {
                        index_rows: self.artifact.index().len(),
                        metadata_rows: metadata.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            k,
            hits = results.len(),
            best = results.first().map(|r| r.distance),
            "Retrieved neighbours"
        );
        Ok(results)
    }
}
