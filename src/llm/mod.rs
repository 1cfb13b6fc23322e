//! LLM module - model gateway integrations
//!
//! Provides the gateway abstraction, the chat completions HTTP gateway,
//! retry handling and a scripted gateway for tests.

pub mod openai;
pub mod retry;
pub mod scripted;
pub mod traits;
pub mod wire;

pub use openai::ChatCompletionsGateway;
pub use retry::RetryPolicy;
pub use scripted::ScriptedGateway;
pub use traits::{FinishReason, GatewayError, GatewayReply, ModelGateway};
pub use wire::{ChatRequest, ToolChoice, WireMessage, WireTool};
