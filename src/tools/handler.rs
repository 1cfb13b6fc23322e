//! Tool handler trait
//!
//! Handlers are the domain collaborators behind each tool name. They receive
//! arguments that already passed schema validation.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::ExecutionContext;

/// Failure reported by a handler; the message is shown to the model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for handlers
pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// A concrete capability bound to a tool name
///
/// Implementations are shared across conversations and must tolerate
/// concurrent calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with validated arguments
    async fn call(&self, arguments: Value, context: &ExecutionContext) -> HandlerResult;
}
