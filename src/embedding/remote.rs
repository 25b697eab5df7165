//! OpenAI-compatible embeddings client.

use super::EmbeddingProvider;
use crate::config::Config;
use crate::error::{AuditError, Result};
use crate::llm::client::ApiError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Embeddings over HTTP from any `/v1/embeddings` endpoint.
#[derive(Clone)]
pub struct RemoteEmbedder {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl RemoteEmbedder {
    /// Build from the embedding section, borrowing LLM credentials when unset.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedding = &config.embedding;
        let api_base = if embedding.api_base.is_empty() {
            config.llm.api_base.clone()
        } else {
            embedding.api_base.clone()
        };
        let api_key = if embedding.api_key.is_empty() {
            config.llm.api_key.clone()
        } else {
            embedding.api_key.clone()
        };
        if api_base.is_empty() {
            return Err(AuditError::Config(
                "Embedding API base URL is required. Set EMBEDDING_API_BASE or LLM_API_BASE."
                    .to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base,
            api_key,
            model: embedding.model.clone(),
            dimension: embedding.dimension,
            batch_size: embedding.batch_size.max(1),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.api_base.trim_end_matches('/'))
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        let response = builder.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AuditError::Embedding(format!(
                "Request failed ({}): {}",
                status, message
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| AuditError::Embedding(format!("Malformed embedding response: {}", e)))?;
        order_embeddings(parsed.data, texts.len(), self.dimension)
    }
}

/// Restore request order and check lengths.
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(AuditError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }

    data.into_iter()
        .map(|d| {
            if d.embedding.len() == dimension {
                Ok(d.embedding)
            } else {
                Err(AuditError::DimensionMismatch {
                    expected: dimension,
                    actual: d.embedding.len(),
                })
            }
        })
        .collect()
}

impl EmbeddingProvider for RemoteEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.request(batch).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_back_to_llm_credentials() {
        let config = Config::with_llm("https://api.example.com/", "secret", "gpt-4o-mini");
        let embedder = RemoteEmbedder::from_config(&config).unwrap();
        assert_eq!(embedder.endpoint(), "https://api.example.com/v1/embeddings");
        assert_eq!(embedder.api_key, "secret");
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn test_missing_base_is_config_error() {
        let config = Config::default();
        assert!(matches!(
            RemoteEmbedder::from_config(&config),
            Err(AuditError::Config(_))
        ));
    }

    #[test]
    fn test_order_embeddings_sorts_by_index() {
        let data = vec![
            EmbeddingData { embedding: vec![2.0, 2.0], index: Some(1) },
            EmbeddingData { embedding: vec![1.0, 1.0], index: Some(0) },
        ];
        let ordered = order_embeddings(data, 2, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
    }

    #[test]
    fn test_order_embeddings_rejects_wrong_dimension() {
        let data = vec![EmbeddingData { embedding: vec![1.0], index: None }];
        assert!(matches!(
            order_embeddings(data, 1, 3),
            Err(AuditError::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_order_embeddings_rejects_wrong_count() {
        assert!(order_embeddings(Vec::new(), 2, 3).is_err());
    }
}
