// Configuration management module
// TOML settings under the platform config directory plus the interactive editor

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, MailConfig, NotesConfig, ProviderConfig, RetrievalConfig, TutorConfig,
};

pub use crate::embeddings::chunking::ChunkingConfig;

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
