//! Local sentence embeddings using candle + sentence-transformers.

use super::EmbeddingProvider;
use crate::error::{AuditError, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;
use tracing::info;

fn embedding_err(context: &str, err: impl std::fmt::Display) -> AuditError {
    AuditError::Embedding(format!("{}: {}", context, err))
}

/// In-process BERT encoder with mean pooling and L2 normalization.
pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl LocalEmbedder {
    /// Load a sentence-transformers model by name.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        info!(model = model_id, "loading embedding model");

        let api = Api::new().map_err(|e| embedding_err("Failed to create HF Hub API", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| embedding_err("Failed to get config.json", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| embedding_err("Failed to get tokenizer.json", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| embedding_err("Failed to get model weights", e))?;

        let raw_config =
            std::fs::read_to_string(&config_path).map_err(|e| AuditError::io(&config_path, e))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|e| embedding_err("Failed to parse config", e))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embedding_err("Failed to load tokenizer", e))?;

        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| embedding_err("Failed to load model weights", e))?
        };

        let model =
            BertModel::load(vb, &config).map_err(|e| embedding_err("Failed to load BERT model", e))?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
        })
    }

    fn encode(&self, texts: &[String]) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_vec = Vec::new();
        let mut attention_mask_vec = Vec::new();

        for encoding in &encodings {
            let mut padded_ids = encoding.get_ids().to_vec();
            let mut padded_mask = encoding.get_attention_mask().to_vec();
            padded_ids.resize(max_len, 0);
            padded_mask.resize(max_len, 0);
            input_ids_vec.extend(padded_ids);
            attention_mask_vec.extend(padded_mask);
        }

        let batch_size = texts.len();
        let token_type_ids_vec = vec![0u32; batch_size * max_len];

        let input_ids = Tensor::from_vec(input_ids_vec, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(attention_mask_vec, (batch_size, max_len), &self.device)?;
        let token_type_ids =
            Tensor::from_vec(token_type_ids_vec, (batch_size, max_len), &self.device)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over the sequence, ignoring padding.
        let mask = attention_mask
            .unsqueeze(2)?
            .to_dtype(output.dtype())?
            .broadcast_as(output.shape())?;
        let summed = (output * &mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / counts)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norms)?;

        normalized.to_vec2::<f32>()
    }
}

impl EmbeddingProvider for LocalEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.encode(texts)
            .map_err(|e| embedding_err("Local embedding failed", e))
    }
}
