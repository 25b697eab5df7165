//! Error types for the compliance auditor.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors that can occur anywhere in the audit pipeline.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The requirement catalog does not exist.
    #[error("Requirement catalog not found at '{0}'")]
    CatalogNotFound(PathBuf),

    /// The requirement catalog exists but cannot be used.
    #[error("Invalid requirement catalog: {0}")]
    InvalidCatalog(String),

    /// A pipeline artifact (chunks, cache, index) does not exist.
    #[error("Artifact not found at '{0}'")]
    ArtifactNotFound(PathBuf),

    /// The vector index has no collection with this name.
    #[error("Collection '{0}' does not exist in the vector index")]
    CollectionNotFound(String),

    /// A collection name that cannot be stored as a single file.
    #[error("Invalid collection name '{0}'")]
    InvalidCollectionName(String),

    /// A vector did not match the collection dimensionality.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Text extraction from a PDF failed.
    #[error("PDF extraction failed for '{path}': {message}")]
    PdfExtraction { path: PathBuf, message: String },

    /// Embedding provider error.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ground-truth report could not be read.
    #[error("Ground truth error: {0}")]
    GroundTruth(String),

    /// A required collaborator failed to initialize.
    #[error("Audit service not ready: {0}")]
    NotReady(String),
}

impl AuditError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the whole pipeline cannot run, rather than
    /// one unit of work failing.
    pub fn is_resource_fatal(&self) -> bool {
        matches!(
            self,
            AuditError::CatalogNotFound(_)
                | AuditError::InvalidCatalog(_)
                | AuditError::ArtifactNotFound(_)
                | AuditError::CollectionNotFound(_)
                | AuditError::NotReady(_)
        )
    }
}

impl From<reqwest::Error> for AuditError {
    fn from(err: reqwest::Error) -> Self {
        AuditError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for AuditError {
    fn from(err: csv::Error) -> Self {
        AuditError::GroundTruth(err.to_string())
    }
}
