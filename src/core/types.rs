//! Shared types used across Showroom modules
//!
//! Contains conversation turns, tool call requests and results, and the
//! execution context handed to tool handlers.

use serde::{Deserialize, Serialize};

/// Role of a participant in the model's input window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool invocation requested by the model
///
/// `raw_arguments` is the provider's serialized payload and is untrusted until
/// it has passed registry validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation token minted by the model provider
    pub id: String,
    /// Name of the tool to invoke
    pub tool_name: String,
    /// Serialized arguments as received from the provider
    pub raw_arguments: String,
}

impl ToolCallRequest {
    /// Create a new tool call request
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        raw_arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            raw_arguments: raw_arguments.into(),
        }
    }
}

/// Category of a failed tool call, reported back to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Arguments did not match the tool's parameter schema
    InvalidArguments,
    /// The model asked for a tool that does not exist
    UnknownTool,
    /// The handler ran and reported a domain failure
    ToolError,
    /// The handler faulted; details are withheld from the model
    InternalFault,
    /// The handler did not finish within the tool timeout
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidArguments => "invalid_arguments",
            FailureKind::UnknownTool => "unknown_tool",
            FailureKind::ToolError => "tool_error",
            FailureKind::InternalFault => "internal_fault",
            FailureKind::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured description of a failed tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    #[serde(rename = "error")]
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a single tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Serialized success payload
    Success(String),
    /// Failure description
    Failure(ToolFailure),
}

/// Result of executing one tool call request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallResult {
    /// Equals the originating [`ToolCallRequest::id`]
    pub correlation_id: String,
    /// Name of the tool that was requested
    pub tool_name: String,
    /// Success payload or failure
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    /// Create a successful result for a request
    pub fn success(request: &ToolCallRequest, payload: impl Into<String>) -> Self {
        Self {
            correlation_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            outcome: ToolOutcome::Success(payload.into()),
        }
    }

    /// Create a failed result for a request
    pub fn failure(
        request: &ToolCallRequest,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            outcome: ToolOutcome::Failure(ToolFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    /// Failure kind, if the call failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            ToolOutcome::Success(_) => None,
            ToolOutcome::Failure(failure) => Some(failure.kind),
        }
    }

    /// Text the model reads for this result
    ///
    /// Failures are rendered as `{"error": <kind>, "message": <text>}`.
    pub fn result_text(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success(payload) => payload.clone(),
            ToolOutcome::Failure(failure) => serde_json::to_string(failure)
                .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", failure.kind)),
        }
    }
}

/// A single immutable entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// Free text from the customer
    User { text: String },
    /// Model output: text, tool call requests, or both
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    },
    /// Result of one tool call, linked by correlation id
    ToolResult(ToolCallResult),
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    /// Create an assistant turn carrying only text
    pub fn assistant(text: impl Into<String>) -> Self {
        Turn::Assistant {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant turn that requests tool calls
    pub fn assistant_tool_calls(text: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Turn::Assistant { text, tool_calls }
    }

    /// Create a tool-result turn
    pub fn tool_result(result: ToolCallResult) -> Self {
        Turn::ToolResult(result)
    }

    /// Wire role of this turn
    pub fn role(&self) -> Role {
        match self {
            Turn::User { .. } => Role::User,
            Turn::Assistant { .. } => Role::Assistant,
            Turn::ToolResult(_) => Role::Tool,
        }
    }

    /// Free text of the turn, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Turn::User { text } => Some(text),
            Turn::Assistant { text, .. } => text.as_deref(),
            Turn::ToolResult(_) => None,
        }
    }

    /// Tool calls carried by an assistant turn
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Turn::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Add another usage sample to this one
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self
            .completion_tokens
            .saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// Identifiers a handler needs to act on behalf of the current conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Tenant (dealership) the conversation belongs to
    pub tenant_id: String,
    /// Conversation/session identifier
    pub session_id: String,
    /// Customer identifier on the messaging channel, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl ExecutionContext {
    /// Create a new execution context
    pub fn new(tenant_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            customer_id: None,
        }
    }

    /// Attach the customer identifier
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}
