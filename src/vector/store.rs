//! File-backed vector store with exact nearest-neighbour search.
//!
//! Each collection lives in `<root>/<name>.bin` (bincode). Collections are
//! loaded when the store is opened and rewritten on every mutation.

use super::{Point, ScoredPoint, VectorIndex};
use crate::config::Distance;
use crate::embedding::{cosine_similarity, dot_product};
use crate::error::{AuditError, Result};
use crate::persistence::{load_artifact, save_artifact};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const COLLECTION_EXT: &str = "bin";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    name: String,
    dimension: usize,
    distance: Distance,
    points: Vec<Point>,
}

impl Collection {
    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.distance {
            Distance::Cosine => cosine_similarity(a, b),
            Distance::Dot => dot_product(a, b),
        }
    }
}

/// Vector store persisted under a root directory.
pub struct LocalVectorStore {
    root: PathBuf,
    collections: HashMap<String, Collection>,
}

impl LocalVectorStore {
    /// Open an existing store. A missing root directory is an error.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(AuditError::ArtifactNotFound(root.to_path_buf()));
        }

        let mut collections = HashMap::new();
        let entries = fs::read_dir(root).map_err(|e| AuditError::io(root, e))?;
        for entry in entries {
            let path = entry.map_err(|e| AuditError::io(root, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(COLLECTION_EXT) {
                continue;
            }
            let collection: Collection = load_artifact(&path)?;
            debug!(
                collection = %collection.name,
                points = collection.points.len(),
                "loaded collection"
            );
            collections.insert(collection.name.clone(), collection);
        }

        Ok(Self {
            root: root.to_path_buf(),
            collections,
        })
    }

    /// Open a store, creating the root directory if needed.
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| AuditError::io(root, e))?;
        Self::open(root)
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, COLLECTION_EXT))
    }

    fn persist(&self, name: &str) -> Result<()> {
        let collection = self.get(name)?;
        save_artifact(collection, &self.collection_path(name))
    }

    fn get(&self, name: &str) -> Result<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| AuditError::CollectionNotFound(name.to_string()))
    }
}

impl VectorIndex for LocalVectorStore {
    fn recreate_collection(
        &mut self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<()> {
        if !is_valid_collection_name(name) {
            return Err(AuditError::InvalidCollectionName(name.to_string()));
        }
        self.collections.insert(
            name.to_string(),
            Collection {
                name: name.to_string(),
                dimension,
                distance,
                points: Vec::new(),
            },
        );
        self.persist(name)
    }

    fn upsert(&mut self, name: &str, points: Vec<Point>) -> Result<()> {
        let collection = self
            .collections
            .get_mut(name)
            .ok_or_else(|| AuditError::CollectionNotFound(name.to_string()))?;

        for point in &points {
            if point.vector.len() != collection.dimension {
                return Err(AuditError::DimensionMismatch {
                    expected: collection.dimension,
                    actual: point.vector.len(),
                });
            }
        }

        let mut positions: HashMap<u64, usize> = collection
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
        for point in points {
            match positions.get(&point.id) {
                Some(&i) => collection.points[i] = point,
                None => {
                    positions.insert(point.id, collection.points.len());
                    collection.points.push(point);
                }
            }
        }

        self.persist(name)
    }

    fn query(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let collection = self.get(name)?;
        if vector.len() != collection.dimension {
            return Err(AuditError::DimensionMismatch {
                expected: collection.dimension,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<ScoredPoint> = collection
            .points
            .iter()
            .map(|point| ScoredPoint {
                id: point.id,
                score: collection.score(vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit);

        Ok(hits)
    }

    fn point_count(&self, name: &str) -> Result<usize> {
        Ok(self.get(name)?.points.len())
    }

    fn collection_exists(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }
}

/// Collection names become file names under the store root.
fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !Path::new(name).is_absolute()
}

impl std::fmt::Debug for LocalVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalVectorStore")
            .field("root", &self.root)
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .finish()
    }
}
