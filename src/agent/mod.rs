//! Agent module - orchestration and conversation management
//!
//! Contains the tool-calling loop, its state machine, the conversation
//! context it runs over and the per-conversation session.

pub mod conversation;
pub mod loop_state;
pub mod orchestrator;
pub mod session;

pub use conversation::{ConversationContext, ConversationHistory};
pub use loop_state::{LoopPhase, LoopState};
pub use orchestrator::{OrchestrationOutcome, OrchestrationRun, Orchestrator};
pub use session::{Agent, AgentReply};
