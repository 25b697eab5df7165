//! Embedding providers.
//!
//! The pipeline only needs text in, fixed-length vectors out. Two backends
//! implement [`EmbeddingProvider`]: an OpenAI-compatible HTTP client and, with
//! the `local-embeddings` feature, an in-process BERT sentence encoder.

#[cfg(feature = "local-embeddings")]
mod local;
mod remote;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

use crate::config::{Config, EmbeddingBackend};
use crate::error::{AuditError, Result};
use std::future::Future;

/// Maps text to fixed-length vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, preserving order.
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    /// Embed a single text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send {
        let batch = vec![text.to_string()];
        async move {
            self.embed_batch(&batch)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AuditError::Embedding("empty embedding response".to_string()))
        }
    }
}

/// The embedding backend selected by configuration.
pub enum Embedder {
    Remote(RemoteEmbedder),
    #[cfg(feature = "local-embeddings")]
    Local(LocalEmbedder),
}

impl Embedder {
    /// Build the configured backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.embedding.provider {
            EmbeddingBackend::Remote => Ok(Embedder::Remote(RemoteEmbedder::from_config(config)?)),
            #[cfg(feature = "local-embeddings")]
            EmbeddingBackend::Local => {
                let model_id = if config.embedding.model.contains('/') {
                    config.embedding.model.clone()
                } else {
                    format!("sentence-transformers/{}", config.embedding.model)
                };
                Ok(Embedder::Local(LocalEmbedder::load(&model_id)?))
            }
            #[cfg(not(feature = "local-embeddings"))]
            EmbeddingBackend::Local => Err(AuditError::Config(
                "embedding.provider 'local' requires the local-embeddings feature".to_string(),
            )),
        }
    }
}

impl EmbeddingProvider for Embedder {
    fn dimension(&self) -> usize {
        match self {
            Embedder::Remote(e) => e.dimension(),
            #[cfg(feature = "local-embeddings")]
            Embedder::Local(e) => e.dimension(),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Embedder::Remote(e) => e.embed_batch(texts).await,
            #[cfg(feature = "local-embeddings")]
            Embedder::Local(e) => e.embed_batch(texts).await,
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Mismatched lengths and zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Dot product of two vectors of equal length.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
