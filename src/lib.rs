//! Showroom - tool-calling chat agent for car dealerships
//!
//! Turns a customer's free-text message into grounded actions (inventory
//! search, sending photos, credit quotes, booking test drives) by letting a
//! remote language model call registered tools, bounded by an iteration cap.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Model gateway contract, chat completions gateway and retry
//! - **Tools**: Tool registry, argument validation, concurrent executor and
//!   the dealership handlers
//! - **Agent**: Orchestration loop, conversation context and sessions
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use showroom::tools::dealership::{Dealership, Inventory};
//! use showroom::{Agent, Config};
//!
//! #[tokio::main]
//! async fn main() -> showroom::Result<()> {
//!     let dealership = Dealership::new(Inventory::sample());
//!     let executor = dealership.toolset(Duration::from_secs(30))?;
//!     let mut agent = Agent::from_config(Config::load(), executor, "demo")?;
//!
//!     let reply = agent.process("any automatic cars under 150 million?").await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, AgentReply, OrchestrationOutcome, Orchestrator};
pub use cli::Repl;
pub use core::{Config, Result, ShowroomError};
