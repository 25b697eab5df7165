//! Compliance Auditor - retrieval-augmented auditing of technical documents.
//!
//! A document is judged against every requirement in a regulatory catalog. For
//! each requirement the judgment prompt carries the document, the requirement
//! text and the regulatory chunks most similar to that requirement, retrieved
//! ahead of time from an indexed PDF corpus.
//!
//! # Pipeline
//!
//! 1. **Ingest**: extract PDF text, normalize it and split it into overlapping chunks
//! 2. **Index**: embed chunks and rebuild a vector collection
//! 3. **Precompute**: retrieve the top-K chunks per requirement and cache them
//! 4. **Audit**: judge a document per requirement and assemble a report
//! 5. **Evaluate**: compare audits with hand-labelled reports
//!
//! # Quick Start
//!
//! ```no_run
//! use compliance_auditor::{
//!     audit::{AuditRequest, AuditService},
//!     config::Config,
//!     llm::LlmClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let judge = LlmClient::from_config(&config);
//!     let service = AuditService::start(&config, judge);
//!
//!     let response = service
//!         .audit(&AuditRequest::new("Our AI system keeps a risk register ..."))
//!         .await?;
//!
//!     for row in &response.requirements {
//!         println!("{} {}: {}", row.mapped_id, row.score, row.auditor_notes);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **ingest**: text extraction and recursive chunking
//! - **embedding**: `EmbeddingProvider` with remote and local backends
//! - **vector**: `VectorIndex` and the file-backed `LocalVectorStore`
//! - **indexer**: `ChunkIndexer` rebuilds a collection from chunks
//! - **retrieval**: `RetrievalPrecomputer` and the requirement-chunk cache
//! - **audit**: `AuditEvaluator`, tolerant judgment parsing, `AuditService`
//! - **eval**: ground truth, metrics and the `EvaluationHarness`

pub mod audit;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod indexer;
pub mod ingest;
pub mod llm;
pub mod persistence;
pub mod retrieval;
pub mod vector;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use audit::{AuditReport, AuditRequest, AuditResponse, AuditService, RequirementReport, Score};
pub use catalog::{Requirement, RequirementCatalog};
pub use config::Config;
pub use error::{AuditError, Result};
pub use indexer::ChunkIndexer;
pub use ingest::Chunk;
pub use llm::{JudgmentProvider, LlmClient};
pub use retrieval::{RequirementChunkCache, RetrievalPrecomputer, RetrievedChunk};
