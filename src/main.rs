use clap::{Parser, Subcommand};
use nursing_rag::Result;
use nursing_rag::commands::{BuildOptions, build_index, run_chat, show_status};
use nursing_rag::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nursing-rag")]
#[command(about = "Question answering over breastfeeding guidance with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding service, language model and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed the chunk files and (re)build the vector index
    Build {
        /// Directory containing the chunk files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory the index is written to
        #[arg(long)]
        index_dir: Option<PathBuf>,
        /// Index name
        #[arg(long)]
        name: Option<String>,
        /// Write an empty index when no chunk file exists
        #[arg(long)]
        allow_empty: bool,
    },
    /// Ask questions in an interactive chat session
    Chat,
    /// Show index and service status
    Status,
}

fn load_config() -> Result<Config> {
    let config_dir = Config::config_dir()?;
    nursing_rag::config::load_config(&config_dir)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Build {
            data_dir,
            index_dir,
            name,
            allow_empty,
        } => {
            let options = BuildOptions {
                data_dir,
                index_dir,
                name,
                allow_empty,
            };
            build_index(&load_config()?, &options).await?;
        }
        Commands::Chat => {
            run_chat(&load_config()?).await?;
        }
        Commands::Status => {
            show_status(&load_config()?).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn chat_command() {
        let cli = Cli::try_parse_from(["nursing-rag", "chat"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Chat));
        }
    }

    #[test]
    fn build_command_defaults() {
        let cli = Cli::try_parse_from(["nursing-rag", "build"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Build {
                data_dir,
                index_dir,
                name,
                allow_empty,
            } = parsed.command
            {
                assert_eq!(data_dir, None);
                assert_eq!(index_dir, None);
                assert_eq!(name, None);
                assert!(!allow_empty);
            }
        }
    }

    #[test]
    fn build_command_with_overrides() {
        let cli = Cli::try_parse_from([
            "nursing-rag",
            "build",
            "--data-dir",
            "/data/chunks",
            "--index-dir",
            "/data/index",
            "--name",
            "qa",
            "--allow-empty",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Build {
                data_dir,
                index_dir,
                name,
                allow_empty,
            } = parsed.command
            {
                assert_eq!(data_dir, Some(PathBuf::from("/data/chunks")));
                assert_eq!(index_dir, Some(PathBuf::from("/data/index")));
                assert_eq!(name, Some("qa".to_string()));
                assert!(allow_empty);
            }
        }
    }

    #[test]
    fn status_command() {
        let cli = Cli::try_parse_from(["nursing-rag", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["nursing-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["nursing-rag", "serve"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["nursing-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
