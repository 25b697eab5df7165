//! Deterministic stand-ins for the external providers, used by unit tests.

use crate::embedding::EmbeddingProvider;
use crate::error::{AuditError, Result};
use crate::llm::JudgmentProvider;
use std::sync::Mutex;

/// Bag-of-words embedder: each lowercased word is hashed into a bucket.
///
/// Texts sharing words get similar vectors, which is enough to make retrieval
/// order predictable without a model.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % self.dimension as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(&word.to_lowercase())] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

/// Judgment provider that answers from a script and records every prompt.
///
/// The first rule whose needle occurs in the prompt wins; a rule with `None`
/// as its answer simulates a provider failure.
pub struct ScriptedJudge {
    rules: Vec<(String, Option<String>)>,
    default: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    /// Always answer with `default`.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default: default.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer `response` when the prompt contains `needle`.
    pub fn on(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Some(response.into())));
        self
    }

    /// Fail when the prompt contains `needle`.
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.rules.push((needle.into(), None));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl JudgmentProvider for ScriptedJudge {
    async fn judge(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        for (needle, answer) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return answer
                    .clone()
                    .ok_or_else(|| AuditError::LlmApi("scripted failure".to_string()));
            }
        }
        Ok(self.default.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
