//! Orchestration integration tests
//!
//! Drives the full loop with a scripted gateway and the dealership tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use showroom::agent::{ConversationContext, OrchestrationOutcome, Orchestrator};
use showroom::core::{ExecutionContext, FailureKind, Role, ToolCallRequest, Turn};
use showroom::llm::{GatewayError, GatewayReply, RetryPolicy, ScriptedGateway};
use showroom::tools::dealership::{Dealership, Inventory};
use showroom::tools::{
    FieldSpec, HandlerError, HandlerResult, ParameterSchema, ToolDefinition, ToolExecutor,
    ToolHandler, ToolRegistry,
};
use tokio::time::timeout;

fn execution() -> ExecutionContext {
    ExecutionContext::new("dealer-1", "chat-42").with_customer("+62811000000")
}

/// Orchestrator over the dealership tools
fn dealership_orchestrator(gateway: Arc<ScriptedGateway>) -> (Orchestrator, Dealership) {
    let dealership = Dealership::new(Inventory::sample());
    let executor = dealership.toolset(Duration::from_secs(5)).unwrap();
    let orchestrator =
        Orchestrator::new(gateway, Arc::new(executor)).with_retry(RetryPolicy::immediate(3));
    (orchestrator, dealership)
}

fn context_for(orchestrator: &Orchestrator, message: &str) -> ConversationContext {
    let mut context = ConversationContext::new(orchestrator.catalog())
        .with_system_prompt("You are a helpful dealership assistant.");
    context.append(Turn::user(message)).unwrap();
    context
}

fn tool_results(context: &ConversationContext) -> Vec<showroom::core::ToolCallResult> {
    context
        .turns()
        .iter()
        .filter_map(|turn| match turn {
            Turn::ToolResult(result) => Some(result.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_search_then_answer() {
    let gateway = Arc::new(ScriptedGateway::new([
        Ok(GatewayReply::wants_tools(
            None,
            vec![ToolCallRequest::new(
                "call_1",
                "search_inventory",
                r#"{"transmission":"Matic","maxPrice":150000000}"#,
            )],
        )),
        Ok(GatewayReply::answered(
            "We have 3 automatic cars under 150 million: V002, V001 and V004.",
        )),
    ]));
    let (orchestrator, _) = dealership_orchestrator(gateway.clone());

    let run = orchestrator
        .run(
            context_for(&orchestrator, "find automatic cars under 150 million"),
            &execution(),
        )
        .await;

    match run.outcome {
        OrchestrationOutcome::FinalAnswer(ref text) => assert!(text.contains("3 automatic")),
        ref other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(run.gateway_calls, 2);
    assert_eq!(gateway.calls(), 2);

    let results = tool_results(&run.context);
    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
    let payload: Value = serde_json::from_str(&results[0].result_text()).unwrap();
    assert_eq!(payload["count"], 3);
}

#[tokio::test]
async fn test_invalid_argument_is_reported_to_model() {
    let gateway = Arc::new(ScriptedGateway::new([
        Ok(GatewayReply::wants_tools(
            None,
            vec![ToolCallRequest::new(
                "call_1",
                "search_inventory",
                r#"{"maxPrice":"cheap"}"#,
            )],
        )),
        Ok(GatewayReply::answered("What is your budget in rupiah?")),
    ]));
    let (orchestrator, _) = dealership_orchestrator(gateway.clone());

    let run = orchestrator
        .run(context_for(&orchestrator, "something cheap"), &execution())
        .await;

    assert_eq!(
        run.outcome,
        OrchestrationOutcome::FinalAnswer("What is your budget in rupiah?".into())
    );
    let results = tool_results(&run.context);
    assert_eq!(results[0].failure_kind(), Some(FailureKind::InvalidArguments));
    assert!(results[0].result_text().contains("maxPrice"));

    // The failure went back to the model on the second call
    let second = &gateway.requests()[1];
    let tool_message = second.messages.last().unwrap();
    assert_eq!(tool_message.role, Role::Tool);
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_message
        .content
        .as_deref()
        .unwrap()
        .contains("invalid_arguments"));
}

#[tokio::test]
async fn test_gateway_timeouts_exhaust_retries() {
    let gateway = Arc::new(ScriptedGateway::repeating(Err(GatewayError::Timeout)));
    let (orchestrator, _) = dealership_orchestrator(gateway.clone());

    let run = orchestrator
        .run(context_for(&orchestrator, "hello"), &execution())
        .await;

    assert!(run.outcome.is_failed());
    assert_eq!(gateway.calls(), 3);
}

#[tokio::test]
async fn test_iteration_cap_stops_runaway_tool_use() {
    let gateway = Arc::new(ScriptedGateway::repeating(Ok(GatewayReply::wants_tools(
        Some("Let me check again".into()),
        vec![ToolCallRequest::new(
            "call_x",
            "search_inventory",
            r#"{"brand":"Toyota"}"#,
        )],
    ))));
    let (orchestrator, _) = dealership_orchestrator(gateway.clone());
    let orchestrator = orchestrator.with_max_iterations(5);

    let run = timeout(
        Duration::from_secs(10),
        orchestrator.run(context_for(&orchestrator, "toyota?"), &execution()),
    )
    .await
    .expect("loop did not terminate");

    assert_eq!(
        run.outcome,
        OrchestrationOutcome::IterationLimitReached("Let me check again".into())
    );
    assert_eq!(gateway.calls(), 5);
    assert_eq!(run.tool_calls, 4);
}

#[tokio::test]
async fn test_iteration_cap_without_text_is_empty() {
    let gateway = Arc::new(ScriptedGateway::repeating(Ok(GatewayReply::wants_tools(
        None,
        vec![ToolCallRequest::new("c", "search_inventory", "{}")],
    ))));
    let (orchestrator, _) = dealership_orchestrator(gateway);
    let orchestrator = orchestrator.with_max_iterations(2);

    let run = orchestrator
        .run(context_for(&orchestrator, "hi"), &execution())
        .await;
    assert_eq!(
        run.outcome,
        OrchestrationOutcome::IterationLimitReached(String::new())
    );
}

struct Exploding;

#[async_trait]
impl ToolHandler for Exploding {
    async fn call(&self, _arguments: Value, _context: &ExecutionContext) -> HandlerResult {
        panic!("database connection string leaked: postgres://secret");
    }
}

struct Refusing;

#[async_trait]
impl ToolHandler for Refusing {
    async fn call(&self, _arguments: Value, _context: &ExecutionContext) -> HandlerResult {
        Err(HandlerError::new("vehicle is reserved"))
    }
}

struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl ToolHandler for Counting {
    async fn call(&self, arguments: Value, _context: &ExecutionContext) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "ok": true, "args": arguments }))
    }
}

#[tokio::test]
async fn test_handler_faults_do_not_end_the_run() {
    let mut registry = ToolRegistry::new();
    for name in ["explode", "refuse", "count"] {
        registry
            .register(ToolDefinition::new(
                name,
                "test tool",
                ParameterSchema::new().field("id", FieldSpec::string("Identifier")),
            ))
            .unwrap();
    }
    let counting = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let mut executor = ToolExecutor::new(Arc::new(registry));
    executor.bind("explode", Arc::new(Exploding)).unwrap();
    executor.bind("refuse", Arc::new(Refusing)).unwrap();
    executor.bind("count", counting.clone()).unwrap();

    let gateway = Arc::new(ScriptedGateway::new([
        Ok(GatewayReply::wants_tools(
            None,
            vec![
                ToolCallRequest::new("a", "explode", "{}"),
                ToolCallRequest::new("b", "refuse", "{}"),
                ToolCallRequest::new("c", "count", r#"{"id":"V001"}"#),
                ToolCallRequest::new("d", "teleport", "{}"),
            ],
        )),
        Ok(GatewayReply::answered("Partly done.")),
    ]));
    let orchestrator = Orchestrator::new(gateway.clone(), Arc::new(executor))
        .with_retry(RetryPolicy::immediate(1));

    let run = orchestrator
        .run(context_for(&orchestrator, "do everything"), &execution())
        .await;

    assert_eq!(
        run.outcome,
        OrchestrationOutcome::FinalAnswer("Partly done.".into())
    );
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    let results = tool_results(&run.context);
    let ids: Vec<_> = results.iter().map(|r| r.correlation_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(results[0].failure_kind(), Some(FailureKind::InternalFault));
    assert!(!results[0].result_text().contains("postgres"));
    assert_eq!(results[1].failure_kind(), Some(FailureKind::ToolError));
    assert!(results[2].is_success());
    assert_eq!(results[3].failure_kind(), Some(FailureKind::UnknownTool));
}

#[tokio::test]
async fn test_each_request_extends_the_previous() {
    let gateway = Arc::new(ScriptedGateway::new([
        Ok(GatewayReply::wants_tools(
            Some("Searching".into()),
            vec![ToolCallRequest::new(
                "s1",
                "search_inventory",
                r#"{"brand":"Honda"}"#,
            )],
        )),
        Ok(GatewayReply::wants_tools(
            None,
            vec![
                ToolCallRequest::new(
                    "p1",
                    "send_images",
                    r#"{"vehicleId":"V002","angles":["front"]}"#,
                ),
                ToolCallRequest::new(
                    "q1",
                    "quote_price",
                    r#"{"vehicleId":"V002","downPayment":40000000,"tenorMonths":"36"}"#,
                ),
            ],
        )),
        Ok(GatewayReply::answered("Here is the Honda with a quote.")),
    ]));
    let (orchestrator, dealership) = dealership_orchestrator(gateway.clone());

    let run = orchestrator
        .run(context_for(&orchestrator, "show me a honda"), &execution())
        .await;
    assert!(matches!(run.outcome, OrchestrationOutcome::FinalAnswer(_)));

    let requests = gateway.requests();
    assert_eq!(requests.len(), 3);
    for pair in requests.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        assert!(later.messages.len() > earlier.messages.len());
        assert_eq!(&later.messages[..earlier.messages.len()], &earlier.messages[..]);
        assert_eq!(later.tools, earlier.tools);
    }
    assert_eq!(requests[0].messages[0].role, Role::System);

    // Tool results follow their assistant turn in call order
    let last = &requests[2].messages;
    let answered: Vec<_> = last
        .iter()
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(answered, vec!["s1", "p1", "q1"]);

    let media = dealership.outbox.drain("chat-42");
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].vehicle_id, "V002");
}
