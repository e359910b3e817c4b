// Hosted model provider
// OpenAI-compatible chat completion and embedding endpoints over blocking HTTP


use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::chat::{ChatMessage, ChatModel, ModelTurn, ToolCall, ToolCallingModel, ToolDefinition};
use crate::config::ProviderConfig;
use crate::embeddings::Embedder;

/// Failure talking to a hosted provider. Never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
    #[error("Provider rejected the credentials (HTTP {0})")]
    Unauthorized(u16),
    #[error("Provider rate limit exceeded (HTTP 429)")]
    RateLimited,
    #[error("Provider returned HTTP {0}")]
    Status(u16),
    #[error("Could not reach provider: {0}")]
    Transport(String),
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<ureq::Error> for ProviderError {
    #[inline]
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status @ (401 | 403)) => Self::Unauthorized(status),
            ureq::Error::StatusCode(429) => Self::RateLimited,
            ureq::Error::StatusCode(status) => Self::Status(status),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Build a blocking HTTP agent with an optional global timeout
pub(crate) fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(timeout)
        .build()
        .into()
}

/// Parse a base URL so that relative endpoint paths are appended to it
pub(crate) fn parse_base_url(base: &str) -> Result<Url, ProviderError> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&normalized)
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid base URL {}: {}", base, e)))
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    temperature: Option<f32>,
    batch_size: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ToolCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    tools: &'a [ToolDefinition],
    tool_choice: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallPayload>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallPayload {
    id: String,
    function: FunctionCallPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl ChatCompletionResponse {
    fn first_message(self) -> Result<ChoiceMessage, ProviderError> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ProviderError::InvalidResponse("completion had no choices".to_string()))
    }
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured environment variable
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(
        config: &ProviderConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: parse_base_url(&config.base_url)?,
            api_key: api_key.into(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: Some(config.temperature),
            batch_size: config.batch_size as usize,
            agent: build_agent(config.timeout_secs.map(Duration::from_secs)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(Some(timeout));
        self
    }

    /// Override the sampling temperature; `None` sends no temperature at all
    #[inline]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    #[inline]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R, ProviderError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid endpoint: {}", e)))?;

        let request_json = serde_json::to_string(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("unserializable request: {}", e)))?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                error!("Request to {} failed: {}", url, e);
                ProviderError::from(e)
            })?;

        serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", path, e)))
    }
}

impl Embedder for OpenAiClient {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let mut response: EmbeddingResponse = self.post_json("embeddings", &request)?;

        if response.data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl ChatModel for OpenAiClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        debug!(
            "Requesting chat completion from {} with {} messages",
            self.chat_model,
            messages.len()
        );

        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages,
            temperature: self.temperature,
        };
        let response: ChatCompletionResponse = self.post_json("chat/completions", &request)?;

        response
            .first_message()?
            .content
            .ok_or_else(|| ProviderError::InvalidResponse("completion had no content".to_string()))
    }
}

impl ToolCallingModel for OpenAiClient {
    fn complete_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ProviderError> {
        debug!(
            "Requesting tool completion from {} with {} tools",
            self.chat_model,
            tools.len()
        );

        let request = ToolCompletionRequest {
            model: &self.chat_model,
            messages,
            temperature: self.temperature,
            tools,
            tool_choice: "auto",
        };
        let response: ChatCompletionResponse = self.post_json("chat/completions", &request)?;
        let message = response.first_message()?;

        match message.tool_calls {
            Some(calls) if !calls.is_empty() => Ok(ModelTurn::ToolCalls(
                calls
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect(),
            )),
            _ => message.content.map(ModelTurn::Reply).ok_or_else(|| {
                ProviderError::InvalidResponse("completion had neither content nor tool calls".to_string())
            }),
        }
    }
}
