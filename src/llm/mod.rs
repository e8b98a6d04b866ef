// Language model module
// Answer generation through a chat completion API

pub mod openai;

pub use openai::OpenAiClient;

use std::fmt;

use crate::{RagError, Result};

/// Produces a free-text answer for a fully assembled prompt.
pub trait AnswerGenerator: Send + Sync {
    /// Blocks until the model answers. The returned text is already trimmed.
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// API key for the language model, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Read the key from the environment variable `var`
    #[inline]
    pub fn from_env(var: &str) -> Result<Self> {
        Self::resolve_with(var, |name| std::env::var(name).ok())
    }

    /// Resolve the key through `lookup`; blank values count as missing
    #[inline]
    pub fn resolve_with<F>(var: &str, lookup: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(var) {
            Some(value) if !value.trim().is_empty() => Ok(Self(value.trim().to_string())),
            _ => Err(RagError::Authentication(format!(
                "set the {var} environment variable to your API key"
            ))),
        }
    }

    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
