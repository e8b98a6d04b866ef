// Configuration management module
// TOML settings for the embedding service, language model, retrieval and index layout

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    ChatConfig, Config, ConfigError, IndexConfig, LlmConfig, OllamaConfig, PromptConfig,
    RetrievalConfig,
};


/// Load `config.toml` from `config_dir`; any failure is a configuration error
///
/// # Errors
/// `RagError::Config` if the file cannot be read, parsed or validated
#[inline]
pub fn load_config(config_dir: &std::path::Path) -> crate::Result<Config> {
    Config::load(config_dir).map_err(|e| crate::RagError::Config(format!("{e:#}")))
}
