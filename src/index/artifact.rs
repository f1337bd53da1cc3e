//! Persisted index artifact: vector index + metadata table + manifest
//!
//! Written once by the offline build, loaded once at serve time and then
//! shared read-only. Loading checks that the index and the metadata table
//! have the same number of rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{FlatIndex, MetadataStore};
use crate::config::ChunkingConfig;
use crate::errors::{LexError, Result};

/// File locations inside the chunks directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub corpus: PathBuf,
    pub index: PathBuf,
    pub metadata: PathBuf,
    pub manifest: PathBuf,
    /// Segmentation settings that produced the corpus
    pub chunking: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            corpus: dir.join("chunks.jsonl"),
            index: dir.join("index.bin"),
            metadata: dir.join("chunks_meta.parquet"),
            manifest: dir.join("manifest.json"),
            chunking: dir.join("chunking.json"),
        }
    }
}

/// Segmentation settings of a chunk corpus, written by the chunk step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    pub strategy: String,
    pub max_chars: usize,
    pub overlap_sentences: usize,
}

impl ChunkingParams {
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            strategy: config.strategy.to_string(),
            max_chars: config.max_chars,
            overlap_sentences: config.overlap_sentences,
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Settings next to the corpus, or `None` for corpora written without them
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&std::fs::read(path)?)?))
    }
}

/// Build provenance, stored next to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub model_id: String,
    pub dimension: usize,
    pub vector_count: usize,
    /// Settings the indexed corpus was segmented with
    #[serde(flatten)]
    pub chunking: ChunkingParams,
    pub built_at: DateTime<Utc>,
}

impl Manifest {
    pub fn persist(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LexError::ArtifactMissing(path.to_path_buf()));
        }
        Ok(serde_json::from_slice(&std::fs::read(path)?)?)
    }
}

/// Loaded, aligned index and metadata
#[derive(Debug, Clone)]
pub struct IndexArtifact {
    index: FlatIndex,
    metadata: MetadataStore,
    manifest: Option<Manifest>,
}

impl IndexArtifact {
    /// Pair an index with its metadata; row counts must match
    pub fn from_parts(index: FlatIndex, metadata: MetadataStore) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(LexError::IndexMisaligned {
                index_rows: index.len(),
                metadata_rows: metadata.len(),
            });
        }
        Ok(Self {
            index,
            metadata,
            manifest: None,
        })
    }

    /// Load all artifacts. Missing index or metadata is fatal; a missing
    /// manifest only disables the model check.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let index = FlatIndex::load(&paths.index)?;
        let metadata = MetadataStore::load(&paths.metadata)?;
        let mut artifact = Self::from_parts(index, metadata)?;

        match Manifest::load(&paths.manifest) {
            Ok(manifest) => {
                if manifest.dimension != artifact.index.dimension() {
                    return Err(LexError::DimensionMismatch {
                        expected: manifest.dimension,
                        actual: artifact.index.dimension(),
                    });
                }
                if manifest.vector_count != artifact.index.len() {
                    return Err(LexError::StaleManifest {
                        manifest_vectors: manifest.vector_count,
                        index_vectors: artifact.index.len(),
                    });
                }
                artifact.manifest = Some(manifest);
            }
            Err(LexError::ArtifactMissing(path)) => {
                warn!(path = %path.display(), "No build manifest; skipping model check");
            }
            Err(e) => return Err(e),
        }

        info!(
            vectors = artifact.index.len(),
            dimension = artifact.index.dimension(),
            "Index loaded"
        );
        Ok(artifact)
    }

    /// Fail unless the artifact was built with `model_id` at `dimension`
    pub fn ensure_compatible(&self, model_id: &str, dimension: usize) -> Result<()> {
        if self.index.dimension() != dimension {
            return Err(LexError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: dimension,
            });
        }
        if let Some(manifest) = &self.manifest {
            if manifest.model_id != model_id {
                return Err(LexError::Config(format!(
                    "index was built with model '{}' but '{}' is configured",
                    manifest.model_id, model_id
                )));
            }
        }
        Ok(())
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Write through a sibling temporary file and rename into place
pub fn write_atomic(path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".partial");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = write(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}
