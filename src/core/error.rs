//! Custom error types for Showroom
//!
//! Provides a unified error handling system across all modules. Tool failures
//! are deliberately absent here: they travel as data inside
//! [`ToolOutcome`](crate::core::ToolOutcome) so the model can read them.

use thiserror::Error;

use crate::llm::GatewayError;

/// Main error type for Showroom operations
#[derive(Error, Debug)]
pub enum ShowroomError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool with the same name is already registered
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// A handler was bound to a name the registry does not know
    #[error("Tool '{0}' is not registered")]
    UnknownTool(String),

    /// A turn was appended that breaks tool-call/result correlation
    #[error("Conversation linkage error: {0}")]
    ContextLinkage(String),

    /// Remote model endpoint errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Showroom operations
pub type Result<T> = std::result::Result<T, ShowroomError>;

impl ShowroomError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a conversation linkage error
    pub fn linkage(msg: impl Into<String>) -> Self {
        Self::ContextLinkage(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
