//! Orchestration loop state
//!
//! Tracks the phase of a single run, how many model calls it has made and
//! the most recent assistant text.

use crate::core::TokenUsage;
use crate::llm::GatewayReply;

/// Phase of an orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// About to call the model
    AwaitingModel,
    /// Running a batch of tool calls
    Executing,
    /// Model produced a final answer
    Answered,
    /// Model call cap reached while the model still wanted tools
    IterationLimitReached,
    /// Unrecoverable failure
    Failed,
}

impl LoopPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoopPhase::Answered | LoopPhase::IterationLimitReached | LoopPhase::Failed
        )
    }

    /// Whether `next` may follow this phase
    pub fn can_advance_to(self, next: LoopPhase) -> bool {
        use LoopPhase::*;
        matches!(
            (self, next),
            (AwaitingModel, Executing)
                | (AwaitingModel, Answered)
                | (AwaitingModel, IterationLimitReached)
                | (AwaitingModel, Failed)
                | (Executing, AwaitingModel)
                | (Executing, Failed)
        )
    }
}

/// State of one orchestration run
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Model calls issued so far (retries of one call count once)
    pub iteration: usize,
    /// Cap on model calls
    pub max_iterations: usize,
    pub phase: LoopPhase,
    /// Most recent non-empty assistant text
    pub last_text: Option<String>,
    /// Tool calls executed across all batches
    pub tool_calls_executed: usize,
    /// Token usage summed over every reply
    pub usage: TokenUsage,
}

impl LoopState {
    /// Create a new loop state with the given cap
    pub fn new(max_iterations: usize) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            phase: LoopPhase::AwaitingModel,
            last_text: None,
            tool_calls_executed: 0,
            usage: TokenUsage::default(),
        }
    }

    /// Whether another model call is allowed
    pub fn has_iterations_left(&self) -> bool {
        self.iteration < self.max_iterations
    }

    /// Count a model call
    pub fn begin_model_call(&mut self) {
        self.iteration += 1;
    }

    /// Fold a reply into the running totals
    pub fn record_reply(&mut self, reply: &GatewayReply) {
        if let Some(text) = reply.text.as_deref().filter(|t| !t.trim().is_empty()) {
            self.last_text = Some(text.to_string());
        }
        if let Some(ref usage) = reply.usage {
            self.usage.accumulate(usage);
        }
    }

    /// Move to the next phase
    pub fn advance(&mut self, next: LoopPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal loop transition {:?} -> {:?}",
            self.phase,
            next
        );
        self.phase = next;
    }

    /// Best text to show when the cap is hit
    pub fn last_text_or_empty(&self) -> String {
        self.last_text.clone().unwrap_or_default()
    }
}
