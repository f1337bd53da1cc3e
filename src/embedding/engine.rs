//! Local sentence embeddings via Candle
//!
//! Loads a BERT-family sentence encoder from the HuggingFace Hub once and
//! keeps it warm for the life of the process. Vectors are mean-pooled over
//! the attention mask and left unnormalised, so distances stay comparable
//! with thresholds calibrated on the same model.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::fmt::Display;
use std::path::PathBuf;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::Embedder;
use crate::errors::{LexError, Result};

/// Embedding engine backed by a Candle BERT model
pub struct CandleEmbedder {
    model_id: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

fn unavailable(context: &str, err: impl Display) -> LexError {
    LexError::EmbeddingUnavailable(format!("{}: {}", context, err))
}

impl CandleEmbedder {
    /// Download (first use) and load the model. Expensive; call once.
    pub fn load(model_id: &str, max_seq_len: usize) -> Result<Self> {
        let device = Device::Cpu;
        info!(model = model_id, "Loading embedding model");

        let api = Api::new().map_err(|e| unavailable("Failed to create HuggingFace API client", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| unavailable("Failed to download model config", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| unavailable("Failed to download tokenizer", e))?;
        let weights_path = fetch_weights(&repo)?;

        let config_contents = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_contents)
            .map_err(|e| unavailable("Failed to parse model config", e))?;
        let dimension = serde_json::from_str::<serde_json::Value>(&config_contents)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| LexError::EmbeddingUnavailable("Model config has no hidden_size".to_string()))?
            as usize;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| unavailable("Failed to load tokenizer", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_len,
                ..Default::default()
            }))
            .map_err(|e| unavailable("Failed to configure truncation", e))?;
        tokenizer.with_padding(None);

        let vb = if weights_path.extension().is_some_and(|ext| ext == "safetensors") {
            // SAFETY: the weights file is not modified while mapped
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                    .map_err(|e| unavailable("Failed to load model weights", e))?
            }
        } else {
            VarBuilder::from_pth(&weights_path, DType::F32, &device)
                .map_err(|e| unavailable("Failed to load model weights", e))?
        };

        let model = BertModel::load(vb, &config).map_err(|e| unavailable("Failed to create BERT model", e))?;
        info!(model = model_id, dimension, "Embedding model ready");

        Ok(Self {
            model_id: model_id.to_string(),
            model,
            tokenizer,
            device,
            dimension,
        })
    }

    /// Mean pooling with attention mask
    fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .broadcast_as(embeddings.shape())?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        sum_embeddings.broadcast_div(&sum_mask)
    }

    fn forward(&self, texts: &[&str]) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(candle_core::Error::msg)?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = texts.len();

        let mut flat_ids = Vec::with_capacity(batch_size * max_len);
        let mut flat_mask = Vec::with_capacity(batch_size * max_len);
        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            flat_ids.extend_from_slice(ids);
            flat_mask.extend_from_slice(mask);
            flat_ids.extend(std::iter::repeat(0u32).take(max_len - ids.len()));
            flat_mask.extend(std::iter::repeat(0u32).take(max_len - mask.len()));
        }

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self.model.forward(&token_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = Self::mean_pool(&hidden, &attention_mask)?;
        pooled.to_vec2::<f32>()
    }
}

/// Prefer safetensors; older sentence-transformers repos only ship a pickle
fn fetch_weights(repo: &hf_hub::api::sync::ApiRepo) -> Result<PathBuf> {
    match repo.get("model.safetensors") {
        Ok(path) => Ok(path),
        Err(e) => {
            debug!(error = %e, "No safetensors weights, falling back to pytorch_model.bin");
            repo.get("pytorch_model.bin")
                .map_err(|e| unavailable("Failed to download model weights", e))
        }
    }
}

impl Embedder for CandleEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.forward(texts).map_err(|e| unavailable("Inference failed", e))
    }
}
