//! Model gateway trait for abstracting inference backends
//!
//! A gateway performs one stateless request/response exchange and decodes the
//! reply into a uniform shape. It never executes tools.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{TokenUsage, ToolCallRequest};
use crate::llm::wire::ChatRequest;

/// Why a model response ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishReason {
    /// Final text, no tool calls
    Answered,
    /// At least one tool call, text optional
    WantsTools,
    /// Output hit the size limit
    Truncated,
    /// Output withheld by the provider's content filter
    Filtered,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FinishReason::Answered => "answered",
            FinishReason::WantsTools => "wants_tools",
            FinishReason::Truncated => "truncated",
            FinishReason::Filtered => "filtered",
        };
        write!(f, "{}", name)
    }
}

/// Decoded response from a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub finish_reason: FinishReason,
    /// Final or interim text
    pub text: Option<String>,
    /// Tool calls in provider order
    pub tool_calls: Vec<ToolCallRequest>,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

impl GatewayReply {
    /// A final answer
    pub fn answered(text: impl Into<String>) -> Self {
        Self {
            finish_reason: FinishReason::Answered,
            text: Some(text.into()),
            tool_calls: Vec::new(),
            usage: None,
            model: String::new(),
        }
    }

    /// A request for tool calls
    pub fn wants_tools(text: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            finish_reason: FinishReason::WantsTools,
            text,
            tool_calls,
            usage: None,
            model: String::new(),
        }
    }

    /// Output cut at the size limit
    pub fn truncated(text: Option<String>) -> Self {
        Self {
            finish_reason: FinishReason::Truncated,
            text,
            tool_calls: Vec::new(),
            usage: None,
            model: String::new(),
        }
    }

    /// Output blocked by the provider
    pub fn filtered() -> Self {
        Self {
            finish_reason: FinishReason::Filtered,
            text: None,
            tool_calls: Vec::new(),
            usage: None,
            model: String::new(),
        }
    }

    /// Attach usage information
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Failure to obtain a usable reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Connection or I/O failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// No response within the request timeout
    #[error("request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status
    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response decoded but carried nothing usable
    #[error("no usable content in response: {0}")]
    NoUsableContent(String),

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_)
            | GatewayError::Timeout
            | GatewayError::NoUsableContent(_)
            | GatewayError::Decode(_) => true,
            GatewayError::Status { status, .. } => {
                matches!(status, 408 | 429) || *status >= 500
            }
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Timeout => "timeout",
            GatewayError::Status { .. } => "status",
            GatewayError::NoUsableContent(_) => "no_usable_content",
            GatewayError::Decode(_) => "decode",
        }
    }
}

/// Trait for model gateways
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the full context and tool catalog, decode one reply
    async fn complete(&self, request: &ChatRequest) -> Result<GatewayReply, GatewayError>;

    /// Get the gateway name
    fn name(&self) -> &str;
}
