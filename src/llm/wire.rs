//! Wire request format sent to the model
//!
//! Role-tagged messages in conversation order, the tool catalog, and the tool
//! choice mode. Field names follow the OpenAI chat completions format, which
//! most hosted and local providers accept.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Role, ToolCallRequest, ToolCallResult};
use crate::tools::ToolDefinition;

/// A single message on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WireMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Assistant message with optional text and tool call descriptors
    pub fn assistant(content: Option<String>, tool_calls: &[ToolCallRequest]) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: tool_calls.iter().map(WireToolCall::from).collect(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Tool message carrying one result
    pub fn tool(result: &ToolCallResult) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result.result_text()),
            tool_calls: Vec::new(),
            tool_call_id: Some(result.correlation_id.clone()),
            name: Some(result.tool_name.clone()),
        }
    }
}

/// Tool call descriptor `{id, toolName, argumentsAsText}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    pub arguments: String,
}

impl From<&ToolCallRequest> for WireToolCall {
    fn from(request: &ToolCallRequest) -> Self {
        Self {
            id: request.id.clone(),
            kind: "function".to_string(),
            function: WireFunctionCall {
                name: request.tool_name.clone(),
                arguments: request.raw_arguments.clone(),
            },
        }
    }
}

/// Catalog entry `{name, description, parameterSchema}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolDefinition> for WireTool {
    fn from(definition: &ToolDefinition) -> Self {
        Self {
            kind: "function".to_string(),
            function: WireFunction {
                name: definition.name.clone(),
                description: definition.description.clone(),
                parameters: definition.parameters.to_json_schema(),
            },
        }
    }
}

/// Whether the model may call tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool
    Auto,
    /// Tools are described but must not be called
    None,
}

/// Everything one gateway call transmits, apart from sampling options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
    pub tools: Vec<WireTool>,
    pub tool_choice: ToolChoice,
}

impl ChatRequest {
    pub fn new(messages: Vec<WireMessage>, tools: Vec<WireTool>) -> Self {
        Self {
            messages,
            tools,
            tool_choice: ToolChoice::Auto,
        }
    }
}
