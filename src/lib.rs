//! lexsearch - Semantic retrieval over legal texts
//!
//! Turns a corpus of legal documents into a searchable vector index and
//! answers natural-language questions from the passages it retrieves.
//!
//! # Architecture
//!
//! - **Build** (offline): clean → segment → embed → persist index + metadata
//! - **Retrieve**: embed query → exact k-NN → distance filter → context packing
//! - **Answer**: grounded generation through an external chat model, with a
//!   fixed refusal when nothing is retrieved

pub mod errors;

// Re-export commonly used types
pub use errors::{GenerationError, LexError, Result};

// Indexing
pub mod build;
pub mod chunking;
pub mod embedding;
pub mod index;

// Query path
pub mod generation;
pub mod rag;
pub mod retrieval;

// Interface layer
pub mod chat;
pub mod cli;
pub mod config;
pub mod server;

pub use config::Config;
pub use rag::{Answer, AnswerPipeline};
