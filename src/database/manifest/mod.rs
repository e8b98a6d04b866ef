//! Build metadata persisted next to a vector index.
//!
//! Questions must be embedded by the same model that embedded the chunks,
//! otherwise retrieval silently degrades. The manifest records the model and
//! vector dimension at build time so that serving can refuse a mismatched
//! index instead.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::RagError;

/// Distance metric used by every index this crate writes
pub const DISTANCE_METRIC: &str = "l2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub name: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub distance: String,
    pub chunk_count: usize,
    /// Chunk files that were present at build time, in load order
    pub source_files: Vec<String>,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    #[inline]
    pub fn path(directory: &Path, name: &str) -> PathBuf {
        directory.join(format!("{name}.manifest.json"))
    }

    /// Write the manifest, replacing any previous one for this index
    ///
    /// # Errors
    /// `RagError::Config` if the index directory is not writable
    #[inline]
    pub fn save(&self, directory: &Path) -> Result<PathBuf, RagError> {
        let path = Self::path(directory, &self.name);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Storage(format!("Failed to serialize manifest: {}", e)))?;

        fs::write(&path, content).map_err(|e| {
            RagError::Config(format!(
                "Failed to write index manifest {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!("Wrote index manifest to {}", path.display());
        Ok(path)
    }

    /// Delete the manifest of `name`, if any, so the index is not served
    /// while its table is being rewritten
    ///
    /// # Errors
    /// `RagError::Config` if the existing manifest cannot be removed
    #[inline]
    pub fn remove(directory: &Path, name: &str) -> Result<(), RagError> {
        let path = Self::path(directory, name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed index manifest {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RagError::Config(format!(
                "Failed to remove index manifest {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// # Errors
    /// `RagError::Storage` if the manifest is missing or unreadable
    #[inline]
    pub fn load(directory: &Path, name: &str) -> Result<Self, RagError> {
        let path = Self::path(directory, name);

        let content = fs::read_to_string(&path).map_err(|e| {
            RagError::Storage(format!(
                "Failed to read index manifest {}: {}; rebuild the index",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            RagError::Storage(format!(
                "Index manifest {} is corrupt: {}",
                path.display(),
                e
            ))
        })
    }

    /// Check that this index can serve queries embedded by `embedding_model`
    /// into a table holding `stored_dimension`-wide vectors
    ///
    /// # Errors
    /// `RagError::Storage` describing the first mismatch found
    #[inline]
    pub fn verify(&self, embedding_model: &str, stored_dimension: usize) -> Result<(), RagError> {
        if self.embedding_model != embedding_model {
            return Err(RagError::Storage(format!(
                "Index '{}' was built with embedding model '{}' but '{}' is configured; rebuild the index or restore the model setting",
                self.name, self.embedding_model, embedding_model
            )));
        }

        if self.dimension != stored_dimension {
            return Err(RagError::Storage(format!(
                "Index '{}' manifest records {} dimensions but its table stores {}",
                self.name, self.dimension, stored_dimension
            )));
        }

        if self.distance != DISTANCE_METRIC {
            return Err(RagError::Storage(format!(
                "Index '{}' uses unsupported distance metric '{}'",
                self.name, self.distance
            )));
        }

        Ok(())
    }
}
