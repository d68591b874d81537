// Configuration management module
// TOML settings plus the `config` subcommand output

pub mod display;
pub mod settings;

pub use display::{init_config, show_config};
pub use settings::{
    Config, ConfigError, DocumentConfig, LlmBackend, LlmConfig, OllamaConfig, ServerConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
