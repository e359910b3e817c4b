#[cfg(test)]
mod tests;

use serde::Serialize;
use serde_json::Value;

use super::ChatMessage;
use crate::provider::ProviderError;

/// A function the model may ask the caller to run, in the OpenAI `tools` shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct FunctionDefinition {
    name: String,
    description: String,
    parameters: Value,
}

impl ToolDefinition {
    /// `parameters` is a JSON Schema object describing the arguments
    #[inline]
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: "function",
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// A call the model asked for. `arguments` is the raw JSON text it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    /// Decode the arguments into the tool's parameter type
    #[inline]
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProviderError> {
        serde_json::from_str(&self.arguments).map_err(|e| {
            ProviderError::InvalidResponse(format!("arguments for {}: {}", self.name, e))
        })
    }
}

/// What the model answered when offered tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelTurn {
    Reply(String),
    ToolCalls(Vec<ToolCall>),
}

/// A language model that can answer with tool calls
pub trait ToolCallingModel {
    fn complete_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ProviderError>;
}

impl<T: ToolCallingModel + ?Sized> ToolCallingModel for &T {
    #[inline]
    fn complete_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ProviderError> {
        (**self).complete_with_tools(messages, tools)
    }
}
