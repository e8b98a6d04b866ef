// LanceDB vector database module
// Handles vector storage and similarity search for chunk embeddings


pub mod vector_store;

use serde::{Deserialize, Serialize};

/// One chunk as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Insertion order across the whole build, used to break distance ties
    pub position: u32,
    pub vector: Vec<f32>,
    /// Chunk text, verbatim as read from the source file
    pub content: String,
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub position: u32,
    pub content: String,
    /// L2 distance to the query vector; smaller is closer
    pub distance: f32,
}

/// Order search hits nearest first, earlier insertions first on equal distance
#[inline]
pub fn rank_hits(hits: &mut [ScoredChunk]) {
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.position.cmp(&b.position))
    });
}
