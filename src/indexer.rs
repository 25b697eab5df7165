//! Chunk indexer - populates a vector collection from a chunked corpus.
//!
//! Indexing is a full rebuild:
//! 1. Embed chunk contents in batches
//! 2. Drop the old status marker and recreate the collection
//! 3. Upsert one point per chunk with payload {source, content, chunk_id}
//! 4. Write a status marker with the point count
//!
//! Nothing is touched until every chunk is embedded, so a failed embedding
//! call leaves the previous collection and its marker in place.

use crate::config::Distance;
use crate::embedding::EmbeddingProvider;
use crate::error::{AuditError, Result};
use crate::ingest::Chunk;
use crate::persistence::{load_artifact, save_artifact};
use crate::vector::{Payload, Point, VectorIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the status marker inside the index directory.
pub const STATUS_FILENAME: &str = "status.json";

/// Options for index construction.
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    /// Number of chunks sent to the embedder per request.
    pub batch_size: usize,
    /// Where to write the status marker, if anywhere.
    pub status_path: Option<PathBuf>,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            status_path: None,
        }
    }
}

/// Outcome of an indexing run, also persisted as the status marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub status: String,
    pub collection: String,
    pub count: usize,
    pub dimension: usize,
    pub distance: Distance,
    pub indexed_at: DateTime<Utc>,
}

impl IndexStatus {
    /// Read a status marker. Only a sanity signal; nothing gates on it.
    pub fn load(path: &Path) -> Result<Self> {
        load_artifact(path)
    }
}

/// Status marker location for an index directory.
pub fn status_path(index_path: &Path) -> PathBuf {
    index_path.join(STATUS_FILENAME)
}

/// Embeds chunks and writes them into a vector index.
pub struct ChunkIndexer<'a, E, V> {
    embedder: &'a E,
    index: &'a mut V,
    options: IndexerOptions,
}

impl<'a, E: EmbeddingProvider, V: VectorIndex> ChunkIndexer<'a, E, V> {
    /// Create a new indexer with default options.
    pub fn new(embedder: &'a E, index: &'a mut V) -> Self {
        Self::with_options(embedder, index, IndexerOptions::default())
    }

    /// Create with custom options.
    pub fn with_options(embedder: &'a E, index: &'a mut V, options: IndexerOptions) -> Self {
        Self {
            embedder,
            index,
            options,
        }
    }

    /// Rebuild `collection` from `chunks`.
    ///
    /// Any existing collection with the same name is dropped once all chunks
    /// are embedded, so rerunning with an updated corpus fully replaces the
    /// previous contents.
    pub async fn index(
        &mut self,
        collection: &str,
        distance: Distance,
        chunks: &[Chunk],
    ) -> Result<IndexStatus> {
        let dimension = self.embedder.dimension();
        let points = self.embed_chunks(chunks).await?;

        if let Some(path) = &self.options.status_path {
            if path.exists() {
                fs::remove_file(path).map_err(|e| AuditError::io(path, e))?;
            }
        }

        self.index
            .recreate_collection(collection, dimension, distance)?;
        info!(collection, dimension, chunks = chunks.len(), "recreated collection");

        self.index.upsert(collection, points)?;
        let count = self.index.point_count(collection)?;

        let status = IndexStatus {
            status: "indexed".to_string(),
            collection: collection.to_string(),
            count,
            dimension,
            distance,
            indexed_at: Utc::now(),
        };

        if let Some(path) = &self.options.status_path {
            save_artifact(&status, path)?;
        }

        info!(collection, count, "indexing complete");
        Ok(status)
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Point>> {
        let batch_size = self.options.batch_size.max(1);
        let mut points = Vec::with_capacity(chunks.len());

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(AuditError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                points.push(Point {
                    id: points.len() as u64,
                    vector,
                    payload: Payload::from(chunk),
                });
            }
            debug!(batch = batch_no, embedded = points.len(), "embedded batch");
        }

        Ok(points)
    }
}
