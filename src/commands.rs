use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::chat::run_repl;
use crate::config::Config;
use crate::database::{IndexManifest, VectorStore};
use crate::embeddings::{Embedder, OllamaClient};
use crate::indexer::{BuildReport, IndexBuilder};
use crate::llm::{AnswerGenerator, ApiKey, OpenAiClient};
use crate::rag::{ChunkRetriever, ConversationSession, InteractionLoop, PromptTemplate, Retriever};
use crate::{RagError, Result};

/// Command-line overrides for `build`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub data_dir: Option<PathBuf>,
    pub index_dir: Option<PathBuf>,
    pub name: Option<String>,
    pub allow_empty: bool,
}

impl BuildOptions {
    /// Copy of `config` with these overrides applied
    #[inline]
    pub fn apply(&self, config: &Config) -> Result<Config> {
        let mut config = config.clone();
        if let Some(dir) = &self.data_dir {
            config.index.data_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.index_dir {
            config.index.directory = Some(dir.clone());
        }
        if let Some(name) = &self.name {
            config.index.name.clone_from(name);
        }
        config.index.allow_empty |= self.allow_empty;
        config.validate()?;
        Ok(config)
    }
}

/// Build the index with the configured Ollama model
#[inline]
pub async fn build_index(config: &Config, options: &BuildOptions) -> Result<BuildReport> {
    let config = options.apply(config)?;

    let client = OllamaClient::new(&config.ollama)?;
    if let Err(e) = client.health_check() {
        error!("Ollama health check failed: {e:#}");
        eprintln!(
            "{}",
            style(format!(
                "Cannot use Ollama at {}:{} with model {}",
                config.ollama.host, config.ollama.port, config.ollama.model
            ))
            .red()
        );
        eprintln!("Make sure Ollama is running and the model is pulled, or run 'nursing-rag config'.");
        return Err(RagError::Embedding(format!("{e:#}")));
    }

    let report = build_index_with(&config, Arc::new(client)).await?;
    print_build_report(&report);
    Ok(report)
}

/// Build the index described by `config` using `embedder`
#[inline]
pub async fn build_index_with(config: &Config, embedder: Arc<dyn Embedder>) -> Result<BuildReport> {
    let sources = config.chunk_file_paths();
    let index_dir = config.index_dir();
    info!(
        "Building index '{}' from {} chunk files into {}",
        config.index.name,
        sources.len(),
        index_dir.display()
    );

    IndexBuilder::from_config(config, embedder)
        .with_progress(IndexBuilder::terminal_progress())
        .build(&sources, &index_dir, &config.index.name)
        .await
}

fn print_build_report(report: &BuildReport) {
    for missing in &report.missing_files {
        eprintln!(
            "{}",
            style(format!("⚠ Skipped missing chunk file {}", missing.display())).yellow()
        );
    }
    eprintln!(
        "{}",
        style(format!(
            "✓ Indexed {} chunks ({} dimensions, model {})",
            report.manifest.chunk_count, report.manifest.dimension, report.manifest.embedding_model
        ))
        .green()
    );
    eprintln!("Manifest written to: {}", style(report.manifest_path.display()).cyan());
}

/// Wire the retriever, language model and prompt into an interaction loop.
///
/// The index must already exist and must have been built with `embedder`'s
/// model.
#[inline]
pub async fn open_interaction(
    config: &Config,
    api_key: ApiKey,
    embedder: Arc<dyn Embedder>,
) -> Result<InteractionLoop> {
    let retriever = Retriever::open(&config.index_dir(), &config.index.name, embedder).await?;
    let generator = OpenAiClient::new(&config.llm, api_key)?;
    info!("Answering with {} at {}", generator.model(), config.llm.base_url);

    Ok(InteractionLoop::new(
        Arc::new(retriever) as Arc<dyn ChunkRetriever>,
        Arc::new(generator) as Arc<dyn AnswerGenerator>,
        PromptTemplate::from_config(&config.prompt),
        config.retrieval.k,
    ))
}

/// Start an interactive chat session.
///
/// The API key is checked before anything else is loaded.
#[inline]
pub async fn run_chat(config: &Config) -> Result<()> {
    let api_key = ApiKey::from_env(&config.llm.api_key_env)?;

    let client = OllamaClient::new(&config.ollama)?;
    if let Err(e) = client.ping() {
        warn!("Ollama is not reachable: {e:#}");
        eprintln!(
            "{}",
            style("⚠ Ollama is not reachable; questions will fail until it is running").yellow()
        );
    }

    let mut interaction = match open_interaction(config, api_key, Arc::new(client)).await {
        Ok(interaction) => interaction,
        Err(e @ RagError::Storage(_)) => {
            eprintln!("{}", style(format!("❌ {e}")).red());
            eprintln!("Run 'nursing-rag build' to create the index first.");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let mut session = ConversationSession::new();
    info!("Started chat session {}", session.id());
    run_repl(&mut interaction, &mut session, &config.chat).await
}

/// Print the configuration paths, the index manifest and service readiness
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    eprintln!("{}", style("📊 Nursing RAG Status").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Paths:").bold().yellow());
    eprintln!("  Config: {}", style(config.config_file_path().display()).cyan());
    eprintln!("  Chunk files:");
    for path in config.chunk_file_paths() {
        let marker = if path.exists() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        eprintln!("    {} {}", marker, path.display());
    }
    eprintln!("  Index: {}", style(config.index_dir().display()).cyan());

    eprintln!();
    eprintln!("{}", style("Index:").bold().yellow());
    match IndexManifest::load(&config.index_dir(), &config.index.name) {
        Ok(manifest) => {
            eprintln!("  Name: {}", style(&manifest.name).cyan());
            eprintln!("  Chunks: {}", style(manifest.chunk_count).cyan());
            eprintln!(
                "  Embedding: {} ({} dimensions, {} distance)",
                style(&manifest.embedding_model).cyan(),
                manifest.dimension,
                manifest.distance
            );
            eprintln!("  Sources: {}", manifest.source_files.join(", "));
            eprintln!(
                "  Built: {}",
                manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if manifest.embedding_model != config.ollama.model {
                eprintln!(
                    "  {}",
                    style(format!(
                        "⚠ Configured model {} differs; rebuild the index",
                        config.ollama.model
                    ))
                    .yellow()
                );
            }

            match VectorStore::open(&config.index_dir(), &config.index.name).await {
                Ok(store) => match store.count().await {
                    Ok(count) if count == manifest.chunk_count => {
                        eprintln!("  {}", style("✓ Index opens cleanly").green());
                    }
                    Ok(count) => eprintln!(
                        "  {}",
                        style(format!(
                            "⚠ Table holds {count} rows but the manifest records {}",
                            manifest.chunk_count
                        ))
                        .yellow()
                    ),
                    Err(e) => eprintln!("  {}", style(format!("❌ {e}")).red()),
                },
                Err(e) => eprintln!("  {}", style(format!("❌ {e}")).red()),
            }
        }
        Err(e) => {
            eprintln!("  {}", style(format!("Not built ({e})")).yellow());
        }
    }

    eprintln!();
    eprintln!("{}", style("Services:").bold().yellow());
    match OllamaClient::new(&config.ollama).map(|client| client.health_check()) {
        Ok(Ok(())) => eprintln!(
            "  Ollama: {} ({})",
            style("ready").green(),
            config.ollama.model
        ),
        Ok(Err(e)) | Err(e) => eprintln!("  Ollama: {} ({e:#})", style("unavailable").red()),
    }
    let key_state = if ApiKey::from_env(&config.llm.api_key_env).is_ok() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!(
        "  Language model: {} via {} ({} {})",
        config.llm.model, config.llm.base_url, config.llm.api_key_env, key_state
    );

    eprintln!();
    eprintln!("{}", style("💡 Next Steps:").bold());
    eprintln!("   • Use 'nursing-rag build' to (re)build the index");
    eprintln!("   • Use 'nursing-rag chat' to ask questions");

    Ok(())
}
