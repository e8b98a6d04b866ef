#[cfg(test)]
mod tests;

use std::collections::HashSet;

use crate::config::PromptConfig;
use crate::config::settings::DEFAULT_PREAMBLE;

/// Renders the single user message sent to the language model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    preamble: String,
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE)
    }
}

impl PromptTemplate {
    #[inline]
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }

    #[inline]
    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(config.preamble.clone())
    }

    #[inline]
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Preamble, deduplicated sources and the question, in that order.
    ///
    /// The result is trimmed. The question is inserted as given.
    #[inline]
    pub fn render(&self, chunks: &[String], question: &str) -> String {
        let context = dedupe_chunks(chunks).join("\n");
        let prompt = format!(
            "{}\n\nSources:\n{}\n\nUser Question: {}\n\nHelpful Answer:",
            self.preamble.trim(),
            context,
            question
        );
        prompt.trim().to_string()
    }
}

/// Trimmed chunk texts with later duplicates removed; blank chunks are dropped
#[inline]
pub fn dedupe_chunks(chunks: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty() && seen.insert(*chunk))
        .collect()
}
