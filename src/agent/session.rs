//! Conversation session
//!
//! One `Agent` per customer conversation. It seeds each run with the carried
//! history, turns the run's outcome into the text the customer sees and keeps
//! the history for the next message.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::agent::conversation::{ConversationContext, ConversationHistory};
use crate::agent::orchestrator::{OrchestrationOutcome, Orchestrator};
use crate::core::{Config, ExecutionContext, Result, TokenUsage, Turn};
use crate::llm::{ChatCompletionsGateway, ModelGateway, RetryPolicy};
use crate::tools::ToolExecutor;

/// What one user message produced
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// Text to send to the customer
    pub text: String,
    pub outcome: OrchestrationOutcome,
    pub gateway_calls: usize,
    pub tool_calls: usize,
    pub usage: TokenUsage,
}

/// Customer-facing agent for one conversation
pub struct Agent {
    /// Configuration
    config: Config,
    orchestrator: Orchestrator,
    /// Turns carried between messages
    history: ConversationHistory,
    /// Identifiers passed to handlers
    execution: ExecutionContext,
}

impl Agent {
    /// Create an agent from its parts
    pub fn new(config: Config, orchestrator: Orchestrator, execution: ExecutionContext) -> Self {
        let history = ConversationHistory::new(config.agent.max_history);
        Self {
            config,
            orchestrator,
            history,
            execution,
        }
    }

    /// Create an agent that talks to the configured chat completions endpoint
    pub fn from_config(
        config: Config,
        executor: ToolExecutor,
        session_id: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let gateway: Arc<dyn ModelGateway> = Arc::new(ChatCompletionsGateway::from_config(&config)?);
        Ok(Self::with_gateway(config, gateway, executor, session_id))
    }

    /// Create an agent over any gateway
    pub fn with_gateway(
        config: Config,
        gateway: Arc<dyn ModelGateway>,
        executor: ToolExecutor,
        session_id: impl Into<String>,
    ) -> Self {
        let executor =
            executor.with_timeout(Duration::from_secs(config.agent.tool_timeout_secs));
        let orchestrator = Orchestrator::new(gateway, Arc::new(executor))
            .with_retry(RetryPolicy::from_config(&config.retry))
            .with_max_iterations(config.agent.max_iterations);
        let execution = ExecutionContext::new(config.agent.tenant_id.clone(), session_id);
        Self::new(config, orchestrator, execution)
    }

    /// Handle one customer message
    pub async fn process(&mut self, user_input: &str) -> AgentReply {
        let context = self.seed_context();
        let mut context = match context {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "carried history rejected; starting fresh");
                self.history.clear();
                self.base_context()
            }
        };

        if let Err(e) = context.append(Turn::user(user_input)) {
            error!(error = %e, "could not append user message");
            return self.fallback_reply(OrchestrationOutcome::Failed(e.to_string()));
        }

        let run = self.orchestrator.run(context, &self.execution).await;

        let text = match &run.outcome {
            OrchestrationOutcome::Failed(reason) => {
                error!(
                    session = %self.execution.session_id,
                    reason = %reason,
                    "run failed; sending fallback message"
                );
                None
            }
            outcome => outcome
                .text()
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string),
        };

        let answered = matches!(run.outcome, OrchestrationOutcome::FinalAnswer(_)) && text.is_some();
        let text = text.unwrap_or_else(|| self.config.agent.fallback_message.clone());

        let settled = run.context.pending_tool_calls().is_empty();
        let mut turns = run.context.into_turns();
        if !answered {
            // Record what the customer actually saw, in place of a blank answer
            if is_blank_answer(turns.last()) {
                turns.pop();
            }
            if settled {
                turns.push(Turn::assistant(text.clone()));
            } else {
                warn!("run ended with unanswered tool calls; reply not recorded");
            }
        }
        self.history.replace(turns);

        AgentReply {
            text,
            outcome: run.outcome,
            gateway_calls: run.gateway_calls,
            tool_calls: run.tool_calls,
            usage: run.usage,
        }
    }

    fn base_context(&self) -> ConversationContext {
        let context = ConversationContext::new(self.orchestrator.catalog());
        match self.config.agent.system_prompt {
            Some(ref prompt) => context.with_system_prompt(prompt.clone()),
            None => context,
        }
    }

    fn seed_context(&self) -> Result<ConversationContext> {
        self.base_context().seeded(self.history.iter().cloned())
    }

    fn fallback_reply(&self, outcome: OrchestrationOutcome) -> AgentReply {
        AgentReply {
            text: self.config.agent.fallback_message.clone(),
            outcome,
            gateway_calls: 0,
            tool_calls: 0,
            usage: TokenUsage::default(),
        }
    }

    /// Clear conversation history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Names of the tools offered to the model
    pub fn tool_names(&self) -> Vec<String> {
        self.orchestrator
            .catalog()
            .into_iter()
            .map(|definition| definition.name)
            .collect()
    }

    pub fn gateway_name(&self) -> &str {
        self.orchestrator.gateway_name()
    }
}

fn is_blank_answer(turn: Option<&Turn>) -> bool {
    matches!(
        turn,
        Some(Turn::Assistant { text, tool_calls })
            if tool_calls.is_empty() && text.as_deref().is_none_or(|t| t.trim().is_empty())
    )
}
