// Embeddings module
// Maps chunk and question text to vectors through an external embedding model

pub mod ollama;

pub use ollama::OllamaClient;

use crate::Result;

/// A text embedding model.
///
/// Implementations must return vectors of one fixed dimension for a given
/// model; the index records [`Embedder::model_id`] so that questions are
/// embedded with the same model that embedded the chunks.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model, persisted alongside the index
    fn model_id(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per input in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
