//! Corpus ingestion: PDF text extraction, normalization and chunking.

mod chunker;
mod extractor;

pub use chunker::{ChunkConfig, RecursiveChunker, TextChunk, normalize_text, reconstruct};
pub use extractor::{Page, SourceDocument, discover_pdf_files};

use crate::config::IngestionConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// A retrieval unit cut from a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document identifier.
    pub source: String,
    /// Sequence number within the source.
    pub chunk_id: u64,
    /// Chunk text content.
    pub content: String,
}

impl Chunk {
    pub fn new(source: impl Into<String>, chunk_id: u64, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            chunk_id,
            content: content.into(),
        }
    }
}

/// A PDF that could not be ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Source files that produced chunks.
    pub sources: Vec<String>,
    pub skipped: Vec<SkippedSource>,
    pub total_chunks: usize,
}

/// Normalize and chunk one source document.
pub fn chunk_document(document: &SourceDocument, chunker: &RecursiveChunker) -> Vec<Chunk> {
    let text = normalize_text(&document.raw_content());
    chunker
        .split(&text)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| Chunk::new(&document.name, i as u64, chunk.content))
        .collect()
}

/// Extract and chunk every PDF in the configured raw data directory.
///
/// A directory without PDFs yields zero chunks. A PDF that fails extraction is
/// recorded in the report and skipped.
pub fn ingest_corpus(config: &IngestionConfig) -> Result<(Vec<Chunk>, IngestionReport)> {
    let chunker = RecursiveChunker::new(ChunkConfig::from(config))?;
    let files = discover_pdf_files(&config.raw_data_dir)?;

    let mut report = IngestionReport::default();
    let mut chunks = Vec::new();

    if files.is_empty() {
        warn!(dir = %config.raw_data_dir.display(), "no PDF files found in corpus");
        return Ok((chunks, report));
    }

    for path in files {
        info!(file = %path.display(), "extracting");
        match SourceDocument::from_pdf(&path) {
            Ok(document) => {
                let doc_chunks = chunk_document(&document, &chunker);
                info!(
                    source = %document.name,
                    pages = document.page_count(),
                    chunks = doc_chunks.len(),
                    "chunked"
                );
                report.sources.push(document.name.clone());
                chunks.extend(doc_chunks);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable PDF");
                report.skipped.push(SkippedSource {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    report.total_chunks = chunks.len();
    Ok((chunks, report))
}
