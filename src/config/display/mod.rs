use console::style;

use super::{Config, ConfigError, LlmBackend};

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Document:").bold().yellow());
    eprintln!("  Path: {}", style(config.document_path().display()).cyan());
    eprintln!(
        "  Chunking: {} chars, {} overlap",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.overlap).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embeddings (Ollama):").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.ollama.embedding_model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!(
        "  Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Language Model:").bold().yellow());
    match config.llm.backend {
        LlmBackend::Cli => eprintln!(
            "  Backend: {} ({} run {})",
            style("cli").cyan(),
            config.llm.command,
            config.llm.model
        ),
        LlmBackend::Http => eprintln!(
            "  Backend: {} (model {})",
            style("http").cyan(),
            config.llm.model
        ),
    }

    eprintln!();
    eprintln!("{}", style("Tool Server:").bold().yellow());
    let command = config.server.command.as_ref().map_or_else(
        || "<this executable>".to_string(),
        |path| path.display().to_string(),
    );
    eprintln!(
        "  Command: {} {}",
        style(command).cyan(),
        config.server.args.join(" ")
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

/// Write the current (possibly default) configuration to disk
#[inline]
pub fn init_config(config: &Config) -> Result<(), ConfigError> {
    config.save()?;
    eprintln!(
        "{} {}",
        style("Configuration saved to:").green(),
        style(config.config_file_path().display()).cyan()
    );
    Ok(())
}
