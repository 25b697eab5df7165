//! Vector index abstraction.
//!
//! The rest of the pipeline talks to nearest-neighbour search only through
//! [`VectorIndex`]. [`LocalVectorStore`] is the one implementation shipped with
//! the crate: brute-force search over collections persisted to disk.

mod store;

pub use store::LocalVectorStore;

use crate::config::Distance;
use crate::error::Result;
use crate::ingest::Chunk;
use serde::{Deserialize, Serialize};

/// Metadata stored with each point.
///
/// Fields are optional so that points written by other tools degrade to
/// placeholders at retrieval time instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, alias = "text")]
    pub content: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<u64>,
}

impl From<&Chunk> for Payload {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: Some(chunk.source.clone()),
            content: Some(chunk.content.clone()),
            chunk_id: Some(chunk.chunk_id),
        }
    }
}

/// A vector with its payload, keyed by a synthetic integer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: u64,
    /// Similarity under the collection's metric; higher is closer.
    pub score: f32,
    pub payload: Payload,
}

/// Named collections of vectors with nearest-neighbour search.
pub trait VectorIndex {
    /// Drop any existing collection with this name and create an empty one.
    fn recreate_collection(&mut self, name: &str, dimension: usize, distance: Distance)
    -> Result<()>;

    /// Insert points, replacing any with the same id.
    fn upsert(&mut self, name: &str, points: Vec<Point>) -> Result<()>;

    /// Return up to `limit` points ordered by descending score.
    fn query(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;

    /// Number of points stored in a collection.
    fn point_count(&self, name: &str) -> Result<usize>;

    fn collection_exists(&self, name: &str) -> bool;
}
