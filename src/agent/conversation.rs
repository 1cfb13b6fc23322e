//! Conversation context and carried-over history
//!
//! The context is append-only. A tool-result turn must answer a call made by
//! the assistant turn it follows, and no other turn may be appended while
//! calls are still unanswered.

use std::collections::{HashSet, VecDeque};

use crate::core::{Result, ShowroomError, Turn};
use crate::llm::wire::{ChatRequest, WireMessage, WireTool};
use crate::tools::ToolDefinition;

/// Ordered turns plus the active tool set for one run
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    /// System prompt (always first on the wire)
    system_prompt: Option<String>,
    /// Turn log
    turns: Vec<Turn>,
    /// Tools the model may call
    tools: Vec<ToolDefinition>,
}

impl ConversationContext {
    /// Create an empty context with the given tool set
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            system_prompt: None,
            turns: Vec::new(),
            tools,
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Append prior turns, checking linkage as if appended one by one
    pub fn seeded(mut self, history: impl IntoIterator<Item = Turn>) -> Result<Self> {
        for turn in history {
            self.append(turn)?;
        }
        Ok(self)
    }

    /// Append a turn; the only mutator
    pub fn append(&mut self, turn: Turn) -> Result<()> {
        match &turn {
            Turn::ToolResult(result) => {
                let pending = self.pending_tool_calls();
                if !pending.contains(result.correlation_id.as_str()) {
                    return Err(ShowroomError::linkage(format!(
                        "tool result '{}' does not answer an open call of the preceding assistant turn",
                        result.correlation_id
                    )));
                }
            }
            Turn::User { .. } | Turn::Assistant { .. } => {
                let pending = self.pending_tool_calls();
                if !pending.is_empty() {
                    return Err(ShowroomError::linkage(format!(
                        "{} tool call(s) still awaiting results",
                        pending.len()
                    )));
                }

                let calls = turn.tool_calls();
                let unique: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();
                if unique.len() != calls.len() {
                    return Err(ShowroomError::linkage(
                        "assistant turn repeats a tool call id",
                    ));
                }
            }
        }

        self.turns.push(turn);
        Ok(())
    }

    /// Ids of the latest assistant turn's calls that have no result yet
    pub fn pending_tool_calls(&self) -> HashSet<&str> {
        let mut answered = HashSet::new();

        for turn in self.turns.iter().rev() {
            match turn {
                Turn::ToolResult(result) => {
                    answered.insert(result.correlation_id.as_str());
                }
                Turn::Assistant { tool_calls, .. } => {
                    return tool_calls
                        .iter()
                        .map(|call| call.id.as_str())
                        .filter(|id| !answered.contains(id))
                        .collect();
                }
                Turn::User { .. } => break,
            }
        }

        HashSet::new()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the exact request the gateway transmits
    pub fn render(&self) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);

        if let Some(ref prompt) = self.system_prompt {
            messages.push(WireMessage::system(prompt.clone()));
        }

        messages.extend(self.turns.iter().map(|turn| match turn {
            Turn::User { text } => WireMessage::user(text.clone()),
            Turn::Assistant { text, tool_calls } => WireMessage::assistant(text.clone(), tool_calls),
            Turn::ToolResult(result) => WireMessage::tool(result),
        }));

        ChatRequest::new(messages, self.tools.iter().map(WireTool::from).collect())
    }
}

/// Turns carried between user messages of one conversation
///
/// Trimming drops the oldest turns and never leaves the history starting in
/// the middle of a tool round.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationHistory {
    /// Create a new history
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    /// Replace the history with a finished run's turns
    pub fn replace(&mut self, turns: Vec<Turn>) {
        self.turns = turns.into();
        self.trim();
    }

    /// Cut at the earliest user turn that leaves at most `max_turns`. A
    /// latest exchange longer than the limit is kept whole.
    fn trim(&mut self) {
        if self.max_turns == 0 {
            self.turns.clear();
            return;
        }

        let is_user = |turn: &Turn| matches!(turn, Turn::User { .. });
        let excess = self.turns.len().saturating_sub(self.max_turns);
        let cut = self
            .turns
            .iter()
            .skip(excess)
            .position(is_user)
            .map(|offset| excess + offset)
            .or_else(|| self.turns.iter().rposition(is_user));

        match cut {
            Some(index) => {
                self.turns.drain(..index);
            }
            None => self.turns.clear(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Get the last user message
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| matches!(turn, Turn::User { .. }))
            .and_then(Turn::text)
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(40)
    }
}
