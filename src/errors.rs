//! Error types for lexsearch
//!
//! One error enum for the retrieval engine and its artifacts, plus a
//! separate enum for the external generation service so the answer path
//! can tell "no grounding" apart from "service unreachable".

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing and retrieval
#[derive(Error, Debug)]
pub enum LexError {
    /// The embedding model could not be loaded or failed during inference
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// No chunk could be retrieved for the query
    #[error("No relevant context found for the query")]
    NoRelevantContext,

    /// Index and metadata row counts disagree
    #[error("Index/metadata misalignment: index has {index_rows} vectors, metadata has {metadata_rows} rows")]
    IndexMisaligned {
        index_rows: usize,
        metadata_rows: usize,
    },

    /// Build manifest describes a different index than the one on disk
    #[error("Stale build manifest: manifest records {manifest_vectors} vectors, index has {index_vectors}")]
    StaleManifest {
        manifest_vectors: usize,
        index_vectors: usize,
    },

    /// A required artifact file does not exist
    #[error("Artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    /// Malformed binary index
    #[error("Invalid index file: {0}")]
    IndexFormat(String),

    /// Vector dimension differs from the index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Malformed metadata table
    #[error("Invalid metadata table: {0}")]
    MetadataFormat(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Parquet errors
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow errors
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

/// Result type alias for indexing and retrieval
pub type Result<T> = std::result::Result<T, LexError>;

/// Failures of the external text-generation service
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Transport-level failure (connection refused, DNS, TLS)
    #[error("Generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Generation service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Request exceeded the configured timeout
    #[error("Generation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Service answered but produced no text
    #[error("Generation service returned an empty response")]
    EmptyResponse,

    /// Missing credentials or unusable client settings
    #[error("Generation service misconfigured: {0}")]
    Misconfigured(String),
}

impl GenerationError {
    /// Whether a retry has a chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            GenerationError::Status { status, .. } => *status == 429 || *status >= 500,
            GenerationError::Timeout { .. } => true,
            GenerationError::EmptyResponse | GenerationError::Misconfigured(_) => false,
        }
    }
}
