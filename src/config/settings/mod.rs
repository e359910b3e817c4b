
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chat::prompt::{MAIL_ASSISTANT, TUTOR_PERSONA};
use crate::embeddings::chunking::ChunkingConfig;
use crate::provider::ProviderError;

const APP_DIR_NAME: &str = "pdf-chat";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub tutor: TutorConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Hosted model provider settings. The API key itself is only ever read
/// from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Sampling temperature for document-grounded answers
    pub temperature: f32,
    pub batch_size: u32,
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.0,
            batch_size: 64,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages handed to the model per question
    pub top_k: usize,
    /// Name of the persisted PDF index
    pub index_name: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            index_name: "pdf_index".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotesConfig {
    pub api_base: String,
    pub token_env: String,
    pub database_id: Option<String>,
    pub database_id_env: String,
    pub index_name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub request_timeout_secs: u64,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.notion.com".to_string(),
            token_env: "NOTION_TOKEN".to_string(),
            database_id: None,
            database_id_env: "NOTION_DATABASE_ID".to_string(),
            index_name: "notes_index".to_string(),
            chunk_size: 500,
            chunk_overlap: 100,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TutorConfig {
    pub system_prompt: String,
    /// Unset leaves sampling to the model's own default
    pub temperature: Option<f32>,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            system_prompt: TUTOR_PERSONA.to_string(),
            temperature: None,
        }
    }
}

/// Gmail settings for the mail agent. The OAuth access token is only ever
/// read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailConfig {
    pub api_base: String,
    pub token_env: String,
    pub request_timeout_secs: u64,
    pub system_prompt: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
            token_env: "GMAIL_ACCESS_TOKEN".to_string(),
            request_timeout_secs: 30,
            system_prompt: MAIL_ASSISTANT.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL: {0} (must be an http or https URL)")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid environment variable name: {0:?}")]
    InvalidEnvVar(String),
    #[error("Invalid chunk size: {0} (must be greater than 0)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid index name: {0:?} (letters, digits, '_' and '-' only)")]
    InvalidIndexName(String),
    #[error("No Notion database id configured (set notes.database_id or ${0})")]
    MissingDatabaseId(String),
    #[error("System prompt cannot be empty")]
    EmptyPersona,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Defaults rooted at `base_dir`
    #[inline]
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            provider: ProviderConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            notes: NotesConfig::default(),
            tutor: TutorConfig::default(),
            mail: MailConfig::default(),
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Platform configuration directory for the application
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self::with_base_dir(config_dir));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        validate_chunking(&self.chunking)?;
        self.retrieval.validate()?;
        self.notes.validate()?;
        self.tutor.validate()?;
        self.mail.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path for the vector database directory
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vectors")
    }
}

fn validate_chunking(config: &ChunkingConfig) -> Result<(), ConfigError> {
    if config.chunk_size == 0 {
        return Err(ConfigError::InvalidChunkSize(config.chunk_size));
    }

    if config.chunk_overlap >= config.chunk_size {
        return Err(ConfigError::OverlapTooLarge(
            config.chunk_overlap,
            config.chunk_size,
        ));
    }

    Ok(())
}

fn validate_temperature(temperature: f32) -> Result<(), ConfigError> {
    if (0.0..=2.0).contains(&temperature) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTemperature(temperature))
    }
}

fn validate_env_var_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(name.to_string()))
    }
}

fn validate_index_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidIndexName(name.to_string()))
    }
}

fn validate_http_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}

/// Read a required secret from the environment
fn read_env(name: &str) -> Result<String, ProviderError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ProviderError::MissingApiKey(name.to_string()))
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.base_url)?;
        validate_env_var_name(&self.api_key_env)?;

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        validate_temperature(self.temperature)?;

        if self.batch_size == 0 || self.batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if let Some(timeout) = self.timeout_secs {
            if !(1..=600).contains(&timeout) {
                return Err(ConfigError::InvalidTimeout(timeout));
            }
        }

        Ok(())
    }

    /// The API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ProviderError> {
        read_env(&self.api_key_env)
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        validate_http_url(&base_url)?;
        self.base_url = base_url;
        Ok(())
    }

    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f32) -> Result<(), ConfigError> {
        validate_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        validate_index_name(&self.index_name)
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=100).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }
}

impl NotesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.api_base)?;
        validate_env_var_name(&self.token_env)?;
        validate_env_var_name(&self.database_id_env)?;
        validate_index_name(&self.index_name)?;
        validate_chunking(&self.chunking())?;

        if !(1..=600).contains(&self.request_timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.request_timeout_secs));
        }

        Ok(())
    }

    #[inline]
    pub const fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }

    /// The integration token from the configured environment variable
    pub fn token(&self) -> Result<String, ProviderError> {
        read_env(&self.token_env)
    }

    /// The database id from the config file, falling back to the environment
    pub fn resolve_database_id(&self) -> Result<String, ConfigError> {
        self.database_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| read_env(&self.database_id_env).ok())
            .ok_or_else(|| ConfigError::MissingDatabaseId(self.database_id_env.clone()))
    }
}

impl TutorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system_prompt.trim().is_empty() {
            return Err(ConfigError::EmptyPersona);
        }
        self.temperature.map_or(Ok(()), validate_temperature)
    }
}

impl MailConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.api_base)?;
        validate_env_var_name(&self.token_env)?;

        if !(1..=600).contains(&self.request_timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.request_timeout_secs));
        }

        if self.system_prompt.trim().is_empty() {
            return Err(ConfigError::EmptyPersona);
        }

        Ok(())
    }

    /// The Gmail access token from the configured environment variable
    pub fn token(&self) -> Result<String, ProviderError> {
        read_env(&self.token_env)
    }
}
