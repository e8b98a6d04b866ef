// Database module
// LanceDB holds the chunk vectors, a JSON manifest records how they were produced

pub mod lancedb;
pub mod manifest;

pub use self::lancedb::{IndexRecord, ScoredChunk, vector_store::VectorStore};
pub use manifest::{DISTANCE_METRIC, IndexManifest};
