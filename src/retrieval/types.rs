use serde::{Deserialize, Serialize};

use crate::index::ChunkRecord;

/// Retrieved chunk with its distance to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub source: String,
    pub article: Option<String>,
    pub text: String,
    /// Squared Euclidean distance; smaller is more relevant
    pub distance: f32,
}

impl SearchResult {
    pub fn from_record(record: &ChunkRecord, distance: f32) -> Self {
        Self {
            chunk_id: record.chunk_id.clone(),
            source: record.source.clone(),
            article: record.article.clone(),
            text: record.text.clone(),
            distance,
        }
    }
}

/// Knobs applied after the nearest-neighbour search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub top_k: usize,
    /// Results at or above this distance are dropped
    pub threshold: f32,
    /// Nearest results kept when nothing passes the threshold
    pub fallback_count: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 9.5,
            fallback_count: 2,
        }
    }
}
