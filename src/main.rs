use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tax_law_agent::Result;
use tax_law_agent::commands::{ask, chat, configure, list_tools, serve};
use tax_law_agent::config::{Config, get_config_dir};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tax-law-agent")]
#[command(about = "Answer questions about the Tax Procedures Act with a local language model")]
#[command(version)]
struct Cli {
    /// Configuration directory (default: ~/.tax-law-agent)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the document and serve the ask_tax_question tool on stdio
    Serve,
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,
    },
    /// Answer questions read from stdin until 'quit'
    Chat,
    /// List the tools offered by the tool server
    Tools,
    /// Show or initialise the configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with = "init")]
        show: bool,
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON-RPC stream in serve mode
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };
    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Serve => serve(&config).await?,
        Commands::Ask { question } => ask(&config, &question).await?,
        Commands::Chat => chat(&config).await?,
        Commands::Tools => list_tools(&config).await?,
        Commands::Config { init, .. } => configure(&config, init)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["tax-law-agent", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Serve));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn ask_command_with_question() {
        let cli = Cli::try_parse_from(["tax-law-agent", "ask", "When is a penalty due?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "When is a penalty due?");
            } else {
                panic!("expected ask command");
            }
        }
    }

    #[test]
    fn ask_requires_a_question() {
        let cli = Cli::try_parse_from(["tax-law-agent", "ask"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from(["tax-law-agent", "chat", "--config-dir", "/tmp/agent"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Chat));
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/agent")));
        }

        let cli = Cli::try_parse_from(["tax-law-agent", "--config-dir", "/tmp/agent", "serve"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn config_flags() {
        let cli = Cli::try_parse_from(["tax-law-agent", "config", "--init"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show, init } = parsed.command {
                assert!(!show);
                assert!(init);
            }
        }

        let cli = Cli::try_parse_from(["tax-law-agent", "config", "--show", "--init"]);
        assert!(cli.is_err());
    }

    #[test]
    fn tools_command() {
        let cli = Cli::try_parse_from(["tax-law-agent", "tools"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["tax-law-agent", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["tax-law-agent", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
