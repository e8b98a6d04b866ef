
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::RagError;

/// Chunks read from the configured source files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedChunks {
    /// Chunk texts in file-list order, then array order within each file
    pub chunks: Vec<String>,
    pub loaded_files: Vec<PathBuf>,
    pub missing_files: Vec<PathBuf>,
}

/// Read every file in `paths`, each a JSON array of strings.
///
/// Missing files are logged and skipped.
///
/// # Errors
/// `RagError::DataFormat` if a present file is not a JSON array of strings,
/// `RagError::Io` if a present file cannot be read
#[inline]
pub fn load_chunk_files(paths: &[PathBuf]) -> Result<LoadedChunks, RagError> {
    let mut loaded = LoadedChunks::default();

    for path in paths {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Chunk file not found, skipping: {}", path.display());
                loaded.missing_files.push(path.clone());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let chunks = parse_chunk_array(path, &content)?;
        debug!("Loaded {} chunks from {}", chunks.len(), path.display());

        loaded.chunks.extend(chunks);
        loaded.loaded_files.push(path.clone());
    }

    info!(
        "Total chunks to embed: {} ({} files loaded, {} missing)",
        loaded.chunks.len(),
        loaded.loaded_files.len(),
        loaded.missing_files.len()
    );
    Ok(loaded)
}

fn parse_chunk_array(path: &Path, content: &str) -> Result<Vec<String>, RagError> {
    serde_json::from_str::<Vec<String>>(content).map_err(|e| RagError::DataFormat {
        path: path.to_path_buf(),
        message: format!("expected a JSON array of strings: {e}"),
    })
}
