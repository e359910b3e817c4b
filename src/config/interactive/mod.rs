#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::Path;
use std::time::Duration;

use super::{Config, ConfigError, ProviderConfig};
use crate::provider::{ProviderError, build_agent, parse_base_url};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 PDF Chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Provider Configuration").bold().yellow());
    eprintln!("Configure the OpenAI-compatible endpoint used for chat and embeddings.");
    eprintln!(
        "The API key itself is read from an environment variable and never stored."
    );
    eprintln!();

    configure_provider(&mut config.provider)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_retrieval(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    match test_provider_connection(&config.provider) {
        Ok(()) => eprintln!("{}", style("✓ Provider connection successful!").green()),
        Err(ProviderError::MissingApiKey(var)) => {
            eprintln!(
                "{}",
                style(format!("⚠ Warning: ${var} is not set")).yellow()
            );
            eprintln!("Export it before processing documents.");
        }
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("⚠ Warning: Could not reach provider: {e}")).yellow()
            );
            eprintln!("You can continue, but chat and indexing will fail until this is fixed.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Provider Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.provider.base_url).cyan());
    eprintln!("  Chat Model: {}", style(&config.provider.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.provider.embedding_model).cyan()
    );
    eprintln!("  Temperature: {}", style(config.provider.temperature).cyan());
    eprintln!("  Batch Size: {}", style(config.provider.batch_size).cyan());
    let key_state = if config.provider.api_key().is_ok() {
        style("set").green()
    } else {
        style("not set").red()
    };
    eprintln!(
        "  API Key: ${} ({})",
        style(&config.provider.api_key_env).cyan(),
        key_state
    );

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!(
        "  Chunk Overlap: {}",
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!("  Index: {}", style(&config.retrieval.index_name).cyan());

    eprintln!();
    eprintln!("{}", style("Notes Settings:").bold().yellow());
    eprintln!("  API Base: {}", style(&config.notes.api_base).cyan());
    match config.notes.resolve_database_id() {
        Ok(id) => eprintln!("  Database: {}", style(id).cyan()),
        Err(e) => eprintln!("  Database: {} ({})", style("Unset").red(), e),
    }
    eprintln!("  Index: {}", style(&config.notes.index_name).cyan());

    eprintln!();
    eprintln!("{}", style("Tutor Settings:").bold().yellow());
    match config.tutor.temperature {
        Some(temperature) => eprintln!("  Temperature: {}", style(temperature).cyan()),
        None => eprintln!("  Temperature: {}", style("model default").dim()),
    }

    eprintln!();
    eprintln!("{}", style("Mail Settings:").bold().yellow());
    eprintln!("  API Base: {}", style(&config.mail.api_base).cyan());
    eprintln!(
        "  Access Token: {}",
        match config.mail.token() {
            Ok(_) => style(format!("${} is set", config.mail.token_env)).green(),
            Err(_) => style(format!("${} is not set", config.mail.token_env)).red(),
        }
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Vector store: {}",
        style(config.vector_database_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config::with_base_dir(config_dir)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_provider(provider: &mut ProviderConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(provider.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ProviderConfig::default().set_base_url(input.clone())
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(provider.api_key_env.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.is_empty() || !input.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                Err("Use letters, digits and underscores only")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(provider.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(provider.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let temperature: f32 = Input::new()
        .with_prompt("Sampling temperature")
        .default(provider.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=2.0).contains(input) {
                Ok(())
            } else {
                Err("Temperature must be between 0.0 and 2.0")
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding requests")
        .default(provider.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    provider.set_base_url(base_url)?;
    provider.api_key_env = api_key_env;
    provider.set_chat_model(chat_model)?;
    provider.set_embedding_model(embedding_model)?;
    provider.set_temperature(temperature)?;
    provider.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(config.chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Chunk size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(config.chunking.chunk_overlap.min(chunk_size.saturating_sub(1)))
        .validate_with(|input: &usize| -> Result<(), String> {
            if *input >= chunk_size {
                Err(format!("Overlap must be smaller than {chunk_size}"))
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Passages retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 100")
            }
        })
        .interact_text()?;

    config.chunking.chunk_size = chunk_size;
    config.chunking.chunk_overlap = chunk_overlap;
    config.retrieval.set_top_k(top_k)?;

    Ok(())
}

/// Query the provider's model listing with the configured credentials
fn test_provider_connection(provider: &ProviderConfig) -> Result<(), ProviderError> {
    let api_key = provider.api_key()?;
    let url = parse_base_url(&provider.base_url)?
        .join("models")
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    build_agent(Some(Duration::from_secs(5)))
        .get(url.as_str())
        .header("Authorization", format!("Bearer {api_key}"))
        .call()?;

    Ok(())
}
