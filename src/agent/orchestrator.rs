//! Orchestrator
//!
//! Runs the tool-calling loop for one user message: call the model, execute
//! the tool calls it asks for, feed the results back, and repeat until the
//! model answers, the iteration cap is hit, or the gateway gives up.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::agent::conversation::ConversationContext;
use crate::agent::loop_state::{LoopPhase, LoopState};
use crate::core::{ExecutionContext, Result, TokenUsage, ToolCallResult, Turn};
use crate::llm::{FinishReason, GatewayReply, ModelGateway, RetryPolicy};
use crate::tools::{ToolDefinition, ToolExecutor};

/// Default cap on model calls per run
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Terminal result of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationOutcome {
    /// The model answered
    FinalAnswer(String),
    /// The cap was hit; carries the last assistant text seen (may be empty)
    IterationLimitReached(String),
    /// Unrecoverable failure; the reason is for operators, not customers
    Failed(String),
}

impl OrchestrationOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, OrchestrationOutcome::Failed(_))
    }

    /// Text to show the customer, if the outcome carries any
    pub fn text(&self) -> Option<&str> {
        match self {
            OrchestrationOutcome::FinalAnswer(text)
            | OrchestrationOutcome::IterationLimitReached(text) => Some(text),
            OrchestrationOutcome::Failed(_) => None,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct OrchestrationRun {
    pub outcome: OrchestrationOutcome,
    /// Context as it stood when the run ended
    pub context: ConversationContext,
    /// Model calls issued (retries count once)
    pub gateway_calls: usize,
    /// Tool calls executed
    pub tool_calls: usize,
    pub usage: TokenUsage,
}

/// Drives the model/tool loop
#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn ModelGateway>,
    executor: Arc<ToolExecutor>,
    retry: RetryPolicy,
    max_iterations: usize,
}

impl Orchestrator {
    /// Create an orchestrator with default retry policy and cap
    pub fn new(gateway: Arc<dyn ModelGateway>, executor: Arc<ToolExecutor>) -> Self {
        Self {
            gateway,
            executor,
            retry: RetryPolicy::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Tool definitions offered to the model, in registration order
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.executor.registry().catalog()
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    /// Run the loop over `context`, which must already end with the user turn
    pub async fn run(
        &self,
        mut context: ConversationContext,
        execution: &ExecutionContext,
    ) -> OrchestrationRun {
        let mut state = LoopState::new(self.max_iterations);

        info!(
            session = %execution.session_id,
            gateway = self.gateway.name(),
            max_iterations = state.max_iterations,
            turns = context.len(),
            "starting orchestration"
        );

        let outcome = loop {
            if !state.has_iterations_left() {
                state.advance(LoopPhase::IterationLimitReached);
                break OrchestrationOutcome::IterationLimitReached(state.last_text_or_empty());
            }

            state.begin_model_call();
            debug!(
                iteration = state.iteration,
                max_iterations = state.max_iterations,
                "calling model"
            );

            let request = context.render();
            let reply = match self.retry.complete(self.gateway.as_ref(), &request).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(
                        session = %execution.session_id,
                        iteration = state.iteration,
                        kind = e.kind(),
                        error = %e,
                        "gateway failed after retries"
                    );
                    state.advance(LoopPhase::Failed);
                    break OrchestrationOutcome::Failed(format!("gateway {}: {}", e.kind(), e));
                }
            };
            state.record_reply(&reply);

            match reply.finish_reason {
                FinishReason::Answered => {
                    let text = reply.text.unwrap_or_default();
                    break self.finish(&mut context, &mut state, text);
                }
                FinishReason::Truncated => match reply.text {
                    Some(text) if !text.trim().is_empty() => {
                        warn!(iteration = state.iteration, "reply truncated; using partial text");
                        break self.finish(&mut context, &mut state, text);
                    }
                    _ => {
                        state.advance(LoopPhase::Failed);
                        break OrchestrationOutcome::Failed(
                            "reply truncated before any text".to_string(),
                        );
                    }
                },
                FinishReason::Filtered => {
                    warn!(iteration = state.iteration, "reply withheld by content filter");
                    state.advance(LoopPhase::Failed);
                    break OrchestrationOutcome::Failed(
                        "reply withheld by content filter".to_string(),
                    );
                }
                FinishReason::WantsTools => {
                    // A batch requested on the last allowed call is never executed
                    if !state.has_iterations_left() {
                        info!(
                            iteration = state.iteration,
                            pending = reply.tool_calls.len(),
                            "iteration cap reached with tool calls pending"
                        );
                        state.advance(LoopPhase::IterationLimitReached);
                        break OrchestrationOutcome::IterationLimitReached(
                            state.last_text_or_empty(),
                        );
                    }

                    state.advance(LoopPhase::Executing);
                    if let Err(e) = self
                        .execute_round(&mut context, &mut state, reply, execution)
                        .await
                    {
                        error!(error = %e, "tool round left the context inconsistent");
                        state.advance(LoopPhase::Failed);
                        break OrchestrationOutcome::Failed(e.to_string());
                    }
                    state.advance(LoopPhase::AwaitingModel);
                }
            }
        };

        match &outcome {
            OrchestrationOutcome::Failed(reason) => warn!(
                gateway_calls = state.iteration,
                tool_calls = state.tool_calls_executed,
                reason = %reason,
                "orchestration failed"
            ),
            OrchestrationOutcome::IterationLimitReached(_) => warn!(
                gateway_calls = state.iteration,
                tool_calls = state.tool_calls_executed,
                "orchestration stopped at iteration cap"
            ),
            OrchestrationOutcome::FinalAnswer(_) => info!(
                gateway_calls = state.iteration,
                tool_calls = state.tool_calls_executed,
                total_tokens = state.usage.total_tokens,
                "orchestration answered"
            ),
        }

        OrchestrationRun {
            outcome,
            context,
            gateway_calls: state.iteration,
            tool_calls: state.tool_calls_executed,
            usage: state.usage,
        }
    }

    fn finish(
        &self,
        context: &mut ConversationContext,
        state: &mut LoopState,
        text: String,
    ) -> OrchestrationOutcome {
        match context.append(Turn::assistant(text.clone())) {
            Ok(()) => {
                state.advance(LoopPhase::Answered);
                OrchestrationOutcome::FinalAnswer(text)
            }
            Err(e) => {
                error!(error = %e, "could not record final answer");
                state.advance(LoopPhase::Failed);
                OrchestrationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Record the assistant's calls, run them, and append every result
    async fn execute_round(
        &self,
        context: &mut ConversationContext,
        state: &mut LoopState,
        reply: GatewayReply,
        execution: &ExecutionContext,
    ) -> Result<()> {
        let calls = reply.tool_calls;
        context.append(Turn::assistant_tool_calls(reply.text, calls.clone()))?;

        info!(
            iteration = state.iteration,
            count = calls.len(),
            tools = ?calls.iter().map(|c| c.tool_name.as_str()).collect::<Vec<_>>(),
            "executing tool calls"
        );

        let results: Vec<ToolCallResult> = self.executor.execute_batch(&calls, execution).await;
        state.tool_calls_executed += results.len();

        for result in results {
            debug!(
                call_id = %result.correlation_id,
                tool = %result.tool_name,
                success = result.is_success(),
                "tool call finished"
            );
            context.append(Turn::tool_result(result))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureKind, ToolCallRequest};
    use crate::llm::{GatewayError, ScriptedGateway};
    use crate::tools::handler::{HandlerResult, ToolHandler};
    use crate::tools::schema::{FieldSpec, ParameterSchema};
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, arguments: Value, _context: &ExecutionContext) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "echo": arguments }))
        }
    }

    fn setup(gateway: ScriptedGateway) -> (Orchestrator, Arc<ScriptedGateway>, Arc<Echo>) {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDefinition::new(
                "echo",
                "Echo the input",
                ParameterSchema::new().field("word", FieldSpec::string("A word").required()),
            ))
            .unwrap();
        let echo = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let mut executor = ToolExecutor::new(Arc::new(registry));
        executor.bind("echo", echo.clone()).unwrap();

        let gateway = Arc::new(gateway);
        let orchestrator = Orchestrator::new(gateway.clone(), Arc::new(executor))
            .with_retry(RetryPolicy::immediate(3));
        (orchestrator, gateway, echo)
    }

    fn start(orchestrator: &Orchestrator) -> ConversationContext {
        let mut context = ConversationContext::new(orchestrator.catalog());
        context.append(Turn::user("say hi")).unwrap();
        context
    }

    fn echo_call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "echo", r#"{"word":"hi"}"#)
    }

    fn execution() -> ExecutionContext {
        ExecutionContext::new("tenant", "session")
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let (orchestrator, gateway, echo) =
            setup(ScriptedGateway::new([Ok(GatewayReply::answered("Hello!"))]));

        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert_eq!(run.outcome, OrchestrationOutcome::FinalAnswer("Hello!".into()));
        assert_eq!(run.gateway_calls, 1);
        assert_eq!(gateway.calls(), 1);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
        assert_eq!(run.context.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let (orchestrator, gateway, echo) = setup(ScriptedGateway::new([
            Ok(GatewayReply::wants_tools(None, vec![echo_call("c1")])),
            Ok(GatewayReply::answered("done")),
        ]));

        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert_eq!(run.outcome, OrchestrationOutcome::FinalAnswer("done".into()));
        assert_eq!(run.gateway_calls, 2);
        assert_eq!(run.tool_calls, 1);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);

        // Second request carries the call and its result
        let second = &gateway.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[2].tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_failed_outcome() {
        let (orchestrator, gateway, _) =
            setup(ScriptedGateway::repeating(Err(GatewayError::Timeout)));

        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert!(run.outcome.is_failed());
        assert_eq!(gateway.calls(), 3);
        assert_eq!(run.gateway_calls, 1);
    }

    #[tokio::test]
    async fn test_cap_skips_last_batch() {
        let (orchestrator, gateway, echo) = setup(ScriptedGateway::repeating(Ok(
            GatewayReply::wants_tools(Some("still looking".into()), vec![echo_call("c1")]),
        )));
        let orchestrator = orchestrator.with_max_iterations(3);

        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert_eq!(
            run.outcome,
            OrchestrationOutcome::IterationLimitReached("still looking".into())
        );
        assert_eq!(gateway.calls(), 3);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 2);
        assert!(run.context.pending_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_fed_back() {
        let (orchestrator, gateway, echo) = setup(ScriptedGateway::new([
            Ok(GatewayReply::wants_tools(
                None,
                vec![ToolCallRequest::new("c1", "echo", r#"{"word": 7}"#)],
            )),
            Ok(GatewayReply::answered("sorry")),
        ]));

        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert_eq!(run.outcome, OrchestrationOutcome::FinalAnswer("sorry".into()));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);

        let result = run
            .context
            .turns()
            .iter()
            .find_map(|t| match t {
                Turn::ToolResult(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(result.failure_kind(), Some(FailureKind::InvalidArguments));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_truncated_and_filtered() {
        let (orchestrator, _, _) =
            setup(ScriptedGateway::new([Ok(GatewayReply::truncated(Some("partial".into())))]));
        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert_eq!(run.outcome, OrchestrationOutcome::FinalAnswer("partial".into()));

        let (orchestrator, _, _) = setup(ScriptedGateway::new([Ok(GatewayReply::truncated(None))]));
        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert!(run.outcome.is_failed());

        let (orchestrator, _, _) = setup(ScriptedGateway::new([Ok(GatewayReply::filtered())]));
        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert!(run.outcome.is_failed());
    }

    #[tokio::test]
    async fn test_duplicate_call_ids_fail_run() {
        let (orchestrator, _, echo) = setup(ScriptedGateway::new([Ok(
            GatewayReply::wants_tools(None, vec![echo_call("c1"), echo_call("c1")]),
        )]));

        let run = orchestrator.run(start(&orchestrator), &execution()).await;
        assert!(run.outcome.is_failed());
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }
}
