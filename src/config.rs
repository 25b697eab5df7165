//! Configuration for the compliance auditor.
//!
//! Loaded from a YAML parameters file (`params.yaml` in the working directory,
//! or the platform config directory), then overridden by environment variables.
//! Environment variables take precedence over file values.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// Maximum tokens for response
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Upper bound on a single request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            request_timeout_secs: 30,
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    Remote,
    /// In-process BERT model (requires the `local-embeddings` feature).
    Local,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    /// Falls back to `llm.api_base` when empty.
    pub api_base: String,
    /// Falls back to `llm.api_key` when empty.
    pub api_key: String,
    pub model: String,
    /// Vector length produced by the model.
    pub dimension: usize,
    /// Texts per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Remote,
            api_base: String::new(),
            api_key: String::new(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 32,
        }
    }
}

/// Corpus ingestion and chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub raw_data_dir: PathBuf,
    pub processed_data_dir: PathBuf,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters of context shared by adjacent chunks.
    pub chunk_overlap: usize,
    /// Split points, most to least meaningful. Must end with `""`.
    pub separators: Vec<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from("data/raw"),
            processed_data_dir: PathBuf::from("data/processed"),
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: default_separators(),
        }
    }
}

/// Article markers first, then paragraphs, lines, words, characters.
pub fn default_separators() -> Vec<String> {
    ["\nArticle ", "\nArticolo ", "\n\n", "\n", " ", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl IngestionConfig {
    /// Location of the ingested chunk artifact.
    pub fn chunks_path(&self) -> PathBuf {
        self.processed_data_dir.join("chunks.json")
    }
}

/// Distance metric for nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
    Dot,
}

/// Vector index parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizationConfig {
    pub vector_index_path: PathBuf,
    pub collection_name: String,
    pub distance: Distance,
}

impl Default for VectorizationConfig {
    fn default() -> Self {
        Self {
            vector_index_path: PathBuf::from("data/processed/vector_index"),
            collection_name: "legal_docs".to_string(),
            distance: Distance::Cosine,
        }
    }
}

/// Retrieval precompute parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecomputeConfig {
    /// Chunks retrieved per requirement.
    pub top_k: usize,
    pub chunks_output: PathBuf,
}

impl Default for PrecomputeConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            chunks_output: PathBuf::from("data/processed/requirement_chunks.json"),
        }
    }
}

/// Audit evaluator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub catalog_path: PathBuf,
    /// Cap on the number of requirements evaluated per document.
    pub max_requirements: Option<usize>,
    /// Judgment calls in flight at once. 1 evaluates sequentially.
    pub concurrency: usize,
    pub debug_dump_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data/mapping.json"),
            max_requirements: None,
            concurrency: 1,
            debug_dump_path: None,
        }
    }
}

/// One hand-labelled evaluation case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthCase {
    #[serde(default = "default_case_name")]
    pub name: String,
    pub document_path: PathBuf,
    pub report_path: PathBuf,
}

fn default_case_name() -> String {
    "unknown".to_string()
}

/// Evaluation harness parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub metrics_output: PathBuf,
    pub history_output: Option<PathBuf>,
    pub random_seed: u64,
    pub ground_truth: Vec<GroundTruthCase>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            metrics_output: PathBuf::from("metrics/rag_eval.json"),
            history_output: Some(PathBuf::from("metrics/rag_eval_history.jsonl")),
            random_seed: 42,
            ground_truth: Vec::new(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub ingestion: IngestionConfig,
    pub vectorization: VectorizationConfig,
    pub precompute: PrecomputeConfig,
    pub audit: AuditConfig,
    pub evaluation: EvaluationConfig,
}

/// Name of the parameters file looked up in the working directory.
pub const PARAMS_FILENAME: &str = "params.yaml";

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_*, EMBEDDING_*)
    /// 2. `./params.yaml`, else `~/.config/compliance-auditor/config.yaml`
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(PARAMS_FILENAME);
        let path = if local.exists() {
            Some(local)
        } else {
            Self::config_file_path().filter(|p| p.exists())
        };

        let mut config = match path {
            Some(path) => Self::load_from_file(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load from an explicit file, then apply environment overrides.
    pub fn load_with_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let mut config = Self::load_from_file(path)?;
                config.apply_env();
                Ok(config)
            }
            None => Self::load(),
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| AuditError::Config(format!("Failed to parse config file: {}", e)))
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }
        if let Ok(api_key) = env::var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(tokens) = parse_env("LLM_MAX_TOKENS") {
            self.llm.max_tokens = tokens;
        }
        if let Some(temp) = parse_env("LLM_TEMPERATURE") {
            self.llm.temperature = temp;
        }
        if let Some(secs) = parse_env("LLM_TIMEOUT_SECS") {
            self.llm.request_timeout_secs = secs;
        }

        if let Ok(api_base) = env::var("EMBEDDING_API_BASE") {
            self.embedding.api_base = api_base;
        }
        if let Ok(api_key) = env::var("EMBEDDING_API_KEY") {
            self.embedding.api_key = api_key;
        }
        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dimension) = parse_env("EMBEDDING_DIMENSION") {
            self.embedding.dimension = dimension;
        }
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "compliance-auditor")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate pipeline parameters that every stage relies on.
    pub fn validate(&self) -> Result<()> {
        let ingestion = &self.ingestion;
        if ingestion.chunk_size == 0 {
            return Err(AuditError::Config("chunk_size must be positive".to_string()));
        }
        if ingestion.chunk_overlap >= ingestion.chunk_size {
            return Err(AuditError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                ingestion.chunk_overlap, ingestion.chunk_size
            )));
        }
        if ingestion.separators.last().map(String::as_str) != Some("") {
            return Err(AuditError::Config(
                "separators must be non-empty and end with the empty string".to_string(),
            ));
        }
        if self.precompute.top_k == 0 {
            return Err(AuditError::Config("precompute.top_k must be positive".to_string()));
        }
        if self.audit.concurrency == 0 {
            return Err(AuditError::Config("audit.concurrency must be positive".to_string()));
        }
        if self.embedding.batch_size == 0 || self.embedding.dimension == 0 {
            return Err(AuditError::Config(
                "embedding batch_size and dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that a judgment provider can be built.
    pub fn validate_llm(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(AuditError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(AuditError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(AuditError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.llm.request_timeout_secs, 30);
        assert_eq!(config.precompute.top_k, 3);
        assert_eq!(config.vectorization.collection_name, "legal_docs");
        assert_eq!(config.ingestion.separators.last().map(String::as_str), Some(""));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_llm_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate_llm().is_err());
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.model, "gpt-4");
        assert!(config.validate_llm().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
ingestion:
  chunk_size: 500
  chunk_overlap: 50
precompute:
  top_k: 5
evaluation:
  ground_truth:
    - name: case_a
      document_path: data/eval/a.txt
      report_path: data/eval/a.csv
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.ingestion.chunk_size, 500);
        assert_eq!(config.ingestion.chunk_overlap, 50);
        assert_eq!(config.ingestion.separators, default_separators());
        assert_eq!(config.precompute.top_k, 5);
        assert_eq!(config.vectorization.distance, Distance::Cosine);
        assert_eq!(config.evaluation.ground_truth.len(), 1);
        assert_eq!(config.evaluation.ground_truth[0].name, "case_a");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut config = Config::default();
        config.ingestion.chunk_size = 100;
        config.ingestion.chunk_overlap = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_separators_must_end_with_empty() {
        let mut config = Config::default();
        config.ingestion.separators = vec!["\n\n".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }
}
