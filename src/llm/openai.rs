//! Chat completions gateway
//!
//! Async HTTP client for OpenAI-compatible `/chat/completions` endpoints with
//! tool calling. Ollama, OpenRouter and most hosted providers speak it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use crate::core::{Config, Result, ShowroomError, TokenUsage, ToolCallRequest};
use crate::llm::traits::{FinishReason, GatewayError, GatewayReply, ModelGateway};
use crate::llm::wire::{ChatRequest, ToolChoice, WireMessage, WireTool};

/// Longest error body kept in a [`GatewayError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Gateway for an OpenAI-compatible chat completions endpoint
#[derive(Clone)]
pub struct ChatCompletionsGateway {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

/// Chat completions request body
#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [WireTool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Chat completions response (non-streaming)
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ResponseFunction,
}

/// Some providers send `arguments` as an object instead of a string.
#[derive(Debug, Deserialize)]
struct ResponseFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl ChatCompletionsGateway {
    /// Create a gateway from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = config.chat_completions_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gateway.timeout_secs))
            .build()
            .map_err(|e| ShowroomError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.gateway.api_key.clone(),
            model: config.gateway.model.clone(),
            temperature: config.gateway.temperature,
            max_tokens: config.gateway.max_tokens,
        })
    }

    /// Model identifier sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }

    fn body<'a>(&'a self, request: &'a ChatRequest) -> CompletionBody<'a> {
        let has_tools = !request.tools.is_empty();
        CompletionBody {
            model: &self.model,
            messages: &request.messages,
            tools: has_tools.then_some(request.tools.as_slice()),
            tool_choice: has_tools.then_some(request.tool_choice),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

/// Decode a chat completions body into a uniform reply
fn decode_completion(body: &str) -> std::result::Result<GatewayReply, GatewayError> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::NoUsableContent("response has no choices".to_string()))?;
    let message = choice.message.unwrap_or_default();

    let text = message.content.filter(|t| !t.trim().is_empty());
    let tool_calls: Vec<ToolCallRequest> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter(|call| !call.function.name.is_empty())
        .map(|call| {
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
            let arguments = match call.function.arguments {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            ToolCallRequest::new(id, call.function.name, arguments)
        })
        .collect();

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("length") => FinishReason::Truncated,
        Some("content_filter") => FinishReason::Filtered,
        _ if !tool_calls.is_empty() => FinishReason::WantsTools,
        _ if text.is_some() => FinishReason::Answered,
        _ => {
            return Err(GatewayError::NoUsableContent(
                "response carried neither text nor tool calls".to_string(),
            ))
        }
    };

    let tool_calls = match finish_reason {
        FinishReason::WantsTools => tool_calls,
        _ => Vec::new(),
    };

    Ok(GatewayReply {
        finish_reason,
        text,
        tool_calls,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        model: response.model,
    })
}

#[async_trait]
impl ModelGateway for ChatCompletionsGateway {
    async fn complete(&self, request: &ChatRequest) -> std::result::Result<GatewayReply, GatewayError> {
        let body = self.body(request);
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );
        if let Ok(json) = serde_json::to_string(&body) {
            trace!(request = %json, "chat completion request body");
        }

        let mut builder = self.client.post(self.endpoint.clone()).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: truncate(&error_text, MAX_ERROR_BODY),
            });
        }

        let response_text = response.text().await.map_err(transport_error)?;
        trace!(response = %response_text, "chat completion response body");

        decode_completion(&response_text)
    }

    fn name(&self) -> &str {
        "chat_completions"
    }
}
