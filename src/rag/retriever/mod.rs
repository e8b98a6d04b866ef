#[cfg(test)]
mod tests;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::database::{IndexManifest, ScoredChunk, VectorStore};
use crate::embeddings::Embedder;
use crate::{RagError, Result};

/// Source of context passages for a question
#[async_trait]
pub trait ChunkRetriever: Send + Sync {
    /// Up to `k` chunk texts, nearest first
    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<String>>;
}

/// Read-only view of a built index plus the model that embeds questions for it
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: VectorStore,
    manifest: IndexManifest,
}

impl Retriever {
    /// Open the index `name` in `directory` for querying with `embedder`
    ///
    /// # Errors
    /// `RagError::Storage` if the index or its manifest is missing or corrupt,
    /// if the table and manifest disagree on the chunk count, or if it was
    /// built by a different embedding model
    #[inline]
    pub async fn open(directory: &Path, name: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let manifest = IndexManifest::load(directory, name)?;
        let store = VectorStore::open(directory, name).await?;

        let dimension = store
            .dimension()
            .ok_or_else(|| RagError::Storage(format!("Index '{name}' has no vector column")))?;
        manifest.verify(embedder.model_id(), dimension)?;

        let stored = store.count().await?;
        if stored != manifest.chunk_count {
            return Err(RagError::Storage(format!(
                "Index '{}' holds {} chunks but its manifest records {}; rebuild the index",
                name, stored, manifest.chunk_count
            )));
        }

        info!(
            "Loaded index '{}' ({} chunks, model {}, built {})",
            name, stored, manifest.embedding_model, manifest.built_at
        );

        Ok(Self {
            embedder,
            store,
            manifest,
        })
    }

    #[inline]
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Nearest chunks with their distances
    #[inline]
    pub async fn search(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let embedder = Arc::clone(&self.embedder);
        let text = question.to_string();
        let query_vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding task failed: {e}")))??;

        let hits = self.store.search(&query_vector, k).await?;
        debug!("Retrieved {} chunks for question", hits.len());
        Ok(hits)
    }
}

#[async_trait]
impl ChunkRetriever for Retriever {
    async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<String>> {
        let hits = self.search(question, k).await?;
        Ok(hits.into_iter().map(|hit| hit.content).collect())
    }
}
