//! Vector index and metadata store
//!
//! Components:
//! - Flat index: exact k-NN over squared Euclidean distance
//! - Metadata store: chunk records aligned 1:1 with index positions
//! - Artifact: persisted pair plus build manifest, loaded once at startup

pub mod artifact;
pub mod flat;
pub mod metadata;

pub use artifact::{write_atomic, ArtifactPaths, ChunkingParams, IndexArtifact, Manifest};
pub use flat::{squared_l2, FlatIndex, Neighbor};
pub use metadata::{metadata_schema, ChunkRecord, MetadataStore};
