// Indexer module
// One-shot build of the vector index from the chunk files

pub mod sources;


use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::{DISTANCE_METRIC, IndexManifest, IndexRecord, VectorStore};
use crate::embeddings::Embedder;
use crate::{RagError, Result};

pub use sources::{LoadedChunks, load_chunk_files};

/// Builds a persisted vector index from chunk files
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    allow_empty: bool,
    empty_dimension: usize,
    progress: ProgressBar,
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub manifest: IndexManifest,
    pub manifest_path: PathBuf,
    pub missing_files: Vec<PathBuf>,
}

impl IndexBuilder {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: 16,
            allow_empty: false,
            empty_dimension: crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION as usize,
            progress: ProgressBar::hidden(),
        }
    }

    /// Builder settings taken from the `[ollama]` and `[index]` sections
    #[inline]
    pub fn from_config(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(embedder)
            .with_batch_size(config.ollama.batch_size as usize)
            .with_allow_empty(config.index.allow_empty)
            .with_empty_dimension(config.ollama.embedding_dimension as usize)
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Write an empty index instead of failing when no chunk file exists
    #[inline]
    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    /// Vector width of the table created when there is nothing to embed
    #[inline]
    pub fn with_empty_dimension(mut self, dimension: usize) -> Self {
        self.empty_dimension = dimension;
        self
    }

    /// Progress bar advanced once per embedded chunk
    #[inline]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Progress bar for interactive terminals, hidden otherwise
    #[inline]
    pub fn terminal_progress() -> ProgressBar {
        if console::user_attended_stderr() {
            ProgressBar::new(0).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        }
    }

    /// Embed every chunk in `sources` and persist the index as `name` in
    /// `directory`, replacing any index of the same name.
    ///
    /// All embeddings are computed before storage is touched, so a build
    /// that fails while loading or embedding leaves a previous index intact.
    /// Once writing starts the old manifest is removed first, so a build that
    /// fails part way leaves an index that refuses to open until rebuilt.
    ///
    /// # Errors
    /// `RagError::DataFormat` for a malformed chunk file,
    /// `RagError::Config` when no chunk file exists (unless empty builds are
    /// allowed) or the destination cannot be written,
    /// `RagError::Embedding` when the embedding model fails
    #[inline]
    pub async fn build(
        &self,
        sources: &[PathBuf],
        directory: &Path,
        name: &str,
    ) -> Result<BuildReport> {
        let loaded = load_chunk_files(sources)?;

        if loaded.loaded_files.is_empty() {
            if self.allow_empty {
                warn!("No chunk files found; writing an empty index");
            } else {
                let missing: Vec<String> = loaded
                    .missing_files
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                return Err(RagError::Config(format!(
                    "None of the chunk files exist: {}",
                    missing.join(", ")
                )));
            }
        }

        let vectors = self.embed_all(&loaded.chunks).await?;
        let dimension = Self::common_dimension(&vectors)?.unwrap_or(self.empty_dimension);

        let records: Vec<IndexRecord> = loaded
            .chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(position, (content, vector))| {
                let position = u32::try_from(position)
                    .map_err(|_| RagError::Storage("Too many chunks for one index".to_string()))?;
                Ok(IndexRecord {
                    position,
                    vector,
                    content: content.clone(),
                })
            })
            .collect::<Result<_>>()?;

        let mut store = VectorStore::create(directory, name).await?;
        // Without a manifest a half-written table is refused when served
        IndexManifest::remove(directory, name)?;
        store.recreate(dimension).await?;
        store.insert(&records).await?;

        let manifest = IndexManifest {
            name: name.to_string(),
            embedding_model: self.embedder.model_id().to_string(),
            dimension,
            distance: DISTANCE_METRIC.to_string(),
            chunk_count: records.len(),
            source_files: loaded
                .loaded_files
                .iter()
                .map(|path| {
                    path.file_name()
                        .map_or_else(|| path.display().to_string(), |f| f.to_string_lossy().into_owned())
                })
                .collect(),
            built_at: Utc::now(),
        };
        let manifest_path = manifest.save(directory)?;

        info!(
            "Index '{}' saved to {} ({} chunks, {} dimensions)",
            name,
            directory.display(),
            manifest.chunk_count,
            dimension
        );

        Ok(BuildReport {
            manifest,
            manifest_path,
            missing_files: loaded.missing_files,
        })
    }

    async fn embed_all(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>> {
        self.progress.set_length(chunks.len() as u64);
        self.progress.set_position(0);

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let embedder = Arc::clone(&self.embedder);
            let owned = batch.to_vec();
            let embedded = tokio::task::spawn_blocking(move || embedder.embed_batch(&owned))
                .await
                .map_err(|e| RagError::Embedding(format!("Embedding task failed: {e}")))??;
            if embedded.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "Embedding model returned {} vectors for {} chunks",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
            self.progress.inc(batch.len() as u64);
            debug!("Embedded {}/{} chunks", vectors.len(), chunks.len());
        }

        self.progress.finish_and_clear();
        Ok(vectors)
    }

    /// All vectors in one index share a dimension; `None` when there are none
    fn common_dimension(vectors: &[Vec<f32>]) -> Result<Option<usize>> {
        let Some(first) = vectors.first() else {
            return Ok(None);
        };
        let dimension = first.len();

        if dimension == 0 {
            return Err(RagError::Embedding(
                "Embedding model returned an empty vector".to_string(),
            ));
        }

        if let Some((position, other)) = vectors
            .iter()
            .enumerate()
            .find(|(_, vector)| vector.len() != dimension)
        {
            return Err(RagError::Embedding(format!(
                "Chunk {} embedded to {} dimensions, expected {}",
                position,
                other.len(),
                dimension
            )));
        }

        Ok(Some(dimension))
    }
}
