//! In-memory vector index with paired persistence
//!
//! Holds embedded chunks as two parallel ordered lists (vectors and chunk
//! metadata) addressed by position. Exact nearest-neighbor search under
//! Euclidean distance over a full scan, like the flat L2 index it replaces.
//! The index is an explicit object owned by the caller; nothing here is
//! process-global, and concurrent mutation must be serialized externally.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::errors::{RagError, Result};
use crate::types::Chunk;

/// File name of the persisted vector artifact
pub const VECTORS_FILE: &str = "index.bin";
/// File name of the persisted chunk-store artifact
pub const CHUNKS_FILE: &str = "chunks.json";

/// On-disk shape of the vector artifact
#[derive(Serialize, Deserialize)]
struct VectorArtifact {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

/// In-memory nearest-neighbor index over embedded chunks
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
    dim: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index over the given embedder
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            vectors: Vec::new(),
            chunks: Vec::new(),
            dim: None,
        }
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Embedding dimension, fixed at first insert or load
    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    /// Embed and append chunks to the index.
    ///
    /// The first successful call fixes the index dimension; later calls
    /// whose embeddings differ fail with `DimensionMismatch` and leave the
    /// index unchanged.
    pub fn add(&mut self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts)?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dim = match self.dim {
            Some(dim) => dim,
            None => embeddings[0].len(),
        };
        for vector in &embeddings {
            if vector.len() != dim {
                return Err(RagError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
        }

        self.dim = Some(dim);
        self.vectors.extend(embeddings);
        self.chunks.extend_from_slice(chunks);
        Ok(())
    }

    /// Return the `top_k` chunks nearest to the query, nearest first.
    ///
    /// Fails with `IndexNotReady` before any successful `add` or `load`.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>> {
        if self.dim.is_none() || self.vectors.is_empty() {
            return Err(RagError::IndexNotReady);
        }

        let mut query_vectors = self.embedder.embed(&[query.to_string()])?;
        let query_vector = query_vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("embedder returned no query vector".into()))?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, l2_distance_sq(v, &query_vector)))
            .collect();

        // Stable tie-break on position keeps repeated searches deterministic
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(i, _)| self.chunks[i].clone())
            .collect())
    }

    /// Persist vectors and chunk store as a matched pair under `dir`.
    ///
    /// No-op when the index is empty or uninitialized.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let dim = match self.dim {
            Some(dim) if !self.vectors.is_empty() => dim,
            _ => return Ok(()),
        };

        fs::create_dir_all(dir)?;

        let artifact = VectorArtifact {
            dim,
            vectors: self.vectors.clone(),
        };
        let encoded = bincode::serialize(&artifact)?;
        fs::write(dir.join(VECTORS_FILE), encoded)?;

        let json = serde_json::to_string_pretty(&self.chunks)?;
        fs::write(dir.join(CHUNKS_FILE), json)?;

        Ok(())
    }

    /// Restore vectors and chunk store from `dir`, replacing in-memory
    /// state. Fails with `StoreNotFound` if either artifact is missing.
    pub fn load(&mut self, dir: &Path) -> Result<()> {
        let vectors_path = dir.join(VECTORS_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        if !vectors_path.exists() {
            return Err(RagError::StoreNotFound { path: vectors_path });
        }
        if !chunks_path.exists() {
            return Err(RagError::StoreNotFound { path: chunks_path });
        }

        let encoded = fs::read(&vectors_path)?;
        let artifact: VectorArtifact = bincode::deserialize(&encoded)?;

        let json = fs::read_to_string(&chunks_path)?;
        let chunks: Vec<Chunk> = serde_json::from_str(&json)?;

        if artifact.vectors.len() != chunks.len() {
            return Err(RagError::StoreMismatch {
                vectors: artifact.vectors.len(),
                chunks: chunks.len(),
            });
        }

        self.dim = Some(artifact.dim);
        self.vectors = artifact.vectors;
        self.chunks = chunks;
        Ok(())
    }
}

/// Squared Euclidean distance; ordering is the same as for the true
/// distance, so the square root is skipped.
fn l2_distance_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}
