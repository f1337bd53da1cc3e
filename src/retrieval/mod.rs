//! Retrieval orchestration
//!
//! Components:
//! - Retriever: query embedding + k-NN search + metadata lookup
//! - Relevance filter: distance threshold with nearest-result fallback
//! - Context builder: budgeted packing of retained chunks
//! - Article aggregation: citation labels across retained chunks

pub mod context;
pub mod engine;
pub mod filter;
pub mod types;

pub use context::{
    collect_articles, split_articles, AssembledContext, ContextBuilder, PackingPolicy,
    CONTEXT_DELIMITER,
};
pub use engine::Retriever;
pub use filter::filter_relevant;
pub use types::{SearchParams, SearchResult};
