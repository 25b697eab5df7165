//! Retrieval precompute: top-K regulatory chunks per requirement.
//!
//! Retrieval depends only on the requirement, never on the audited document, so
//! it runs once per index build and the result is cached on disk. The cache
//! must be rebuilt whenever the index contents or K change.

use crate::catalog::RequirementCatalog;
use crate::embedding::EmbeddingProvider;
use crate::error::{AuditError, Result};
use crate::persistence::{load_artifact, save_artifact};
use crate::vector::{ScoredPoint, VectorIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Placeholder used when a point has no content in its payload.
pub const MISSING_CONTENT: &str = "content not available";
/// Placeholder used when a point has no source in its payload.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// A chunk returned by a retrieval query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub chunk_id: Option<u64>,
}

impl From<ScoredPoint> for RetrievedChunk {
    fn from(point: ScoredPoint) -> Self {
        let score = if point.score.is_finite() {
            point.score
        } else {
            0.0
        };
        Self {
            content: point
                .payload
                .content
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| MISSING_CONTENT.to_string()),
            source: point
                .payload
                .source
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            score,
            chunk_id: point.payload.chunk_id,
        }
    }
}

/// Requirement name to its retrieved chunks, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementChunkCache {
    entries: BTreeMap<String, Vec<RetrievedChunk>>,
}

impl RequirementChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, requirement: impl Into<String>, chunks: Vec<RetrievedChunk>) {
        self.entries.insert(requirement.into(), chunks);
    }

    /// Chunks for a requirement; `None` when it was never cached.
    pub fn get(&self, requirement: &str) -> Option<&[RetrievedChunk]> {
        self.entries.get(requirement).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_artifact(self, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_artifact(path)
    }

    /// Load the cache, or start empty when the file does not exist.
    ///
    /// Audits still run without a cache, only with no retrieval context.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(cache) => {
                info!(path = %path.display(), requirements = cache.len(), "loaded requirement chunks");
                Ok(cache)
            }
            Err(AuditError::ArtifactNotFound(_)) => {
                warn!(path = %path.display(), "requirement chunk cache not found, auditing without retrieval context");
                Ok(Self::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// A requirement whose retrieval failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRequirement {
    pub requirement: String,
    pub reason: String,
}

/// Summary of one precompute run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecomputeReport {
    pub requirements: usize,
    pub cached: usize,
    pub failed: Vec<FailedRequirement>,
    pub top_k: usize,
}

/// Builds the requirement-chunk cache from a catalog and a vector index.
pub struct RetrievalPrecomputer<'a, E, V> {
    embedder: &'a E,
    index: &'a V,
    collection: String,
    top_k: usize,
}

impl<'a, E: EmbeddingProvider, V: VectorIndex> RetrievalPrecomputer<'a, E, V> {
    pub fn new(embedder: &'a E, index: &'a V, collection: impl Into<String>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            top_k,
        }
    }

    /// Retrieve the top-K chunks for one query text.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        let vector = self.embedder.embed(query).await?;
        let mut hits: Vec<RetrievedChunk> = self
            .index
            .query(&self.collection, &vector, self.top_k)?
            .into_iter()
            .map(RetrievedChunk::from)
            .collect();
        hits.truncate(self.top_k);
        Ok(hits)
    }

    /// Retrieve chunks for every requirement in the catalog.
    ///
    /// A missing collection aborts the run. Any other per-requirement failure
    /// is logged, left out of the cache and listed in the report.
    pub async fn precompute(
        &self,
        catalog: &RequirementCatalog,
    ) -> Result<(RequirementChunkCache, PrecomputeReport)> {
        if !self.index.collection_exists(&self.collection) {
            return Err(AuditError::CollectionNotFound(self.collection.clone()));
        }
        info!(
            collection = %self.collection,
            top_k = self.top_k,
            requirements = catalog.len(),
            "precomputing retrieval"
        );

        let mut cache = RequirementChunkCache::new();
        let mut report = PrecomputeReport {
            requirements: catalog.len(),
            top_k: self.top_k,
            ..Default::default()
        };

        for requirement in catalog.iter() {
            debug!(id = %requirement.id, name = %requirement.name, "retrieving");
            match self.retrieve(&requirement.query_text()).await {
                Ok(chunks) => {
                    cache.insert(&requirement.name, chunks);
                    report.cached += 1;
                }
                Err(e) if e.is_resource_fatal() => return Err(e),
                Err(e) => {
                    warn!(name = %requirement.name, error = %e, "retrieval failed, skipping requirement");
                    report.failed.push(FailedRequirement {
                        requirement: requirement.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(cached = report.cached, failed = report.failed.len(), "precompute complete");
        Ok((cache, report))
    }
}
