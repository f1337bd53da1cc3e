//! Configuration management for lexsearch
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.lexsearch/config.toml unless given explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunking::SegmenterKind;
use crate::embedding::EmbeddingBackend;
use crate::errors::{LexError, Result};
use crate::generation::GenerationProvider;
use crate::retrieval::PackingPolicy;

/// Complete configuration for lexsearch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub paths: PathsConfig,
    pub server: ServerConfig,
}

/// Embedding model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_id: String,
    pub backend: EmbeddingBackend,
    pub batch_size: usize,
    pub max_seq_len: usize,
    /// Vector size of the hashing backend
    pub hash_dimension: usize,
}

/// Segmentation strategy and its bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: SegmenterKind,
    pub max_chars: usize,
    pub overlap_sentences: usize,
    pub article_pattern: String,
}

/// Query-time knobs. The threshold is calibrated per corpus and model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub distance_threshold: f32,
    pub max_context_chars: usize,
    pub fallback_count: usize,
    pub packing: PackingPolicy,
}

/// External generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: GenerationProvider,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// File system layout of the corpus and artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
}

/// HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            backend: EmbeddingBackend::Candle,
            batch_size: 32,
            max_seq_len: 128,
            hash_dimension: 384,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: SegmenterKind::Sentences,
            max_chars: 900,
            overlap_sentences: 2,
            article_pattern: crate::chunking::DEFAULT_ARTICLE_PATTERN.to_string(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            distance_threshold: 9.5,
            max_context_chars: 7000,
            fallback_count: 2,
            packing: PackingPolicy::DropWhole,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.0,
            max_tokens: 500,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LexError::Config(format!("Failed to read config {}: {}", path.display(), e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| LexError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".lexsearch").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(LexError::Config("top_k must be greater than 0".to_string()));
        }

        if !self.retrieval.distance_threshold.is_finite() || self.retrieval.distance_threshold <= 0.0 {
            return Err(LexError::Config(
                "distance_threshold must be a positive finite number".to_string(),
            ));
        }

        if self.retrieval.max_context_chars == 0 {
            return Err(LexError::Config(
                "max_context_chars must be greater than 0".to_string(),
            ));
        }

        if self.chunking.max_chars == 0 {
            return Err(LexError::Config("max_chars must be greater than 0".to_string()));
        }

        if self.embedding.batch_size == 0 {
            return Err(LexError::Config("batch_size must be greater than 0".to_string()));
        }

        if self.embedding.backend == EmbeddingBackend::Hash && self.embedding.hash_dimension == 0 {
            return Err(LexError::Config(
                "hash_dimension must be greater than 0".to_string(),
            ));
        }

        regex::Regex::new(&self.chunking.article_pattern)
            .map_err(|e| LexError::Config(format!("Invalid article_pattern: {}", e)))?;

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| LexError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.data_dir)
    }

    /// Extracted plain text, one file per document
    pub fn raw_txt_dir(&self) -> PathBuf {
        self.data_dir().join("raw_txt")
    }

    /// Output of the cleaning step
    pub fn cleaned_txt_dir(&self) -> PathBuf {
        self.data_dir().join("cleaned_txt")
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.data_dir().join("cleaned_chunks")
    }

    /// Read the API key named by `generation.api_key_env`
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.generation.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
