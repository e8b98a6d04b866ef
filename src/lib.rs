use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid chunk file {}: {message}", path.display())]
    DataFormat { path: PathBuf, message: String },

    #[error("Index storage error: {0}")]
    Storage(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Language model error: {0}")]
    Upstream(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Whether a failure during a single chat turn leaves the session usable.
    #[inline]
    pub fn is_turn_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Upstream(_) | Self::Embedding(_)
        )
    }
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod indexer;
pub mod llm;
pub mod rag;
