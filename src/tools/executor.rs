//! Tool executor - validates and dispatches a batch of tool calls
//!
//! Every request in a batch yields exactly one result carrying the request's
//! correlation id. Valid calls run concurrently; a failing or faulting
//! handler only affects its own result.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::core::{
    ExecutionContext, FailureKind, Result, ShowroomError, ToolCallRequest, ToolCallResult,
};
use crate::tools::handler::ToolHandler;
use crate::tools::registry::{describe_violations, ToolRegistry, Violation};

/// Message the model sees when a handler faults
const INTERNAL_FAULT_MESSAGE: &str = "The tool failed unexpectedly. Try again later or continue without it.";

/// Dispatches validated tool calls to their handlers
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    timeout: Duration,
}

impl ToolExecutor {
    /// Create an executor over a registry with no handlers bound
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bind a handler to a registered tool name
    pub fn bind(&mut self, tool_name: &str, handler: Arc<dyn ToolHandler>) -> Result<()> {
        if !self.registry.contains(tool_name) {
            return Err(ShowroomError::UnknownTool(tool_name.to_string()));
        }
        if self.handlers.contains_key(tool_name) {
            return Err(ShowroomError::DuplicateTool(tool_name.to_string()));
        }

        self.handlers.insert(tool_name.to_string(), handler);
        Ok(())
    }

    /// The registry this executor validates against
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Whether a handler is bound for the tool
    pub fn is_bound(&self, tool_name: &str) -> bool {
        self.handlers.contains_key(tool_name)
    }

    /// Execute one model turn's tool calls
    ///
    /// Results are returned in request order.
    pub async fn execute_batch(
        &self,
        requests: &[ToolCallRequest],
        context: &ExecutionContext,
    ) -> Vec<ToolCallResult> {
        let mut results: Vec<Option<ToolCallResult>> = vec![None; requests.len()];
        let mut set = JoinSet::new();
        let context = Arc::new(context.clone());

        for (index, request) in requests.iter().enumerate() {
            let arguments = match self.registry.decode_and_validate(request) {
                Ok(arguments) => arguments,
                Err(violations) => {
                    let kind = match violations.first() {
                        Some(Violation::UnknownTool(_)) => FailureKind::UnknownTool,
                        _ => FailureKind::InvalidArguments,
                    };
                    let message = describe_violations(&violations);
                    warn!(
                        tool = %request.tool_name,
                        correlation_id = %request.id,
                        violations = %message,
                        "rejected tool call arguments"
                    );
                    results[index] = Some(ToolCallResult::failure(request, kind, message));
                    continue;
                }
            };

            let Some(handler) = self.handlers.get(&request.tool_name).cloned() else {
                warn!(tool = %request.tool_name, "no handler bound for registered tool");
                results[index] = Some(ToolCallResult::failure(
                    request,
                    FailureKind::UnknownTool,
                    format!("{} is not available right now", request.tool_name),
                ));
                continue;
            };

            let request = request.clone();
            let context = Arc::clone(&context);
            let timeout = self.timeout;
            set.spawn(async move {
                let result = run_handler(handler, &request, arguments, &context, timeout).await;
                (index, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => error!(error = %e, "tool task did not complete"),
            }
        }

        results
            .into_iter()
            .zip(requests)
            .map(|(result, request)| {
                result.unwrap_or_else(|| {
                    ToolCallResult::failure(
                        request,
                        FailureKind::InternalFault,
                        INTERNAL_FAULT_MESSAGE,
                    )
                })
            })
            .collect()
    }
}

async fn run_handler(
    handler: Arc<dyn ToolHandler>,
    request: &ToolCallRequest,
    arguments: Value,
    context: &ExecutionContext,
    timeout: Duration,
) -> ToolCallResult {
    debug!(tool = %request.tool_name, correlation_id = %request.id, "running tool");

    let call = AssertUnwindSafe(handler.call(arguments, context)).catch_unwind();

    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(Ok(payload))) => ToolCallResult::success(request, payload_text(payload)),
        Ok(Ok(Err(e))) => {
            debug!(tool = %request.tool_name, error = %e, "tool reported failure");
            ToolCallResult::failure(request, FailureKind::ToolError, e.message)
        }
        Ok(Err(panic)) => {
            error!(
                tool = %request.tool_name,
                correlation_id = %request.id,
                panic = %panic_message(panic.as_ref()),
                "tool handler panicked"
            );
            ToolCallResult::failure(request, FailureKind::InternalFault, INTERNAL_FAULT_MESSAGE)
        }
        Err(_) => {
            warn!(
                tool = %request.tool_name,
                correlation_id = %request.id,
                timeout_ms = timeout.as_millis() as u64,
                "tool timed out"
            );
            ToolCallResult::failure(
                request,
                FailureKind::Timeout,
                format!("{} did not finish in time", request.tool_name),
            )
        }
    }
}

fn payload_text(payload: Value) -> String {
    match payload {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::handler::{HandlerError, HandlerResult};
    use crate::tools::registry::ToolDefinition;
    use crate::tools::schema::{FieldSpec, ParameterSchema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ToolHandler for Counting {
        async fn call(&self, arguments: Value, _context: &ExecutionContext) -> HandlerResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"echo": arguments}))
        }
    }

    struct Panicking;

    #[async_trait]
    impl ToolHandler for Panicking {
        async fn call(&self, _arguments: Value, _context: &ExecutionContext) -> HandlerResult {
            panic!("database password is hunter2");
        }
    }

    struct Failing;

    #[async_trait]
    impl ToolHandler for Failing {
        async fn call(&self, _arguments: Value, _context: &ExecutionContext) -> HandlerResult {
            Err(HandlerError::new("vehicle V9 is not in stock"))
        }
    }

    struct Sleeping;

    #[async_trait]
    impl ToolHandler for Sleeping {
        async fn call(&self, _arguments: Value, _context: &ExecutionContext) -> HandlerResult {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(json!("late"))
        }
    }

    struct Rendezvous(Arc<Barrier>);

    #[async_trait]
    impl ToolHandler for Rendezvous {
        async fn call(&self, _arguments: Value, _context: &ExecutionContext) -> HandlerResult {
            self.0.wait().await;
            Ok(json!("met"))
        }
    }

    fn registry(names: &[&str]) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for name in names {
            registry
                .register(ToolDefinition::new(
                    *name,
                    "test tool",
                    ParameterSchema::new().field("maxPrice", FieldSpec::number("price")),
                ))
                .unwrap();
        }
        Arc::new(registry)
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new("tenant-1", "session-1")
    }

    #[test]
    fn test_bind_requires_registered_tool() {
        let mut executor = ToolExecutor::new(registry(&["search"]));
        let counter = Arc::new(AtomicUsize::new(0));

        assert!(executor.bind("search", Arc::new(Counting(counter.clone()))).is_ok());
        assert!(matches!(
            executor.bind("search", Arc::new(Counting(counter.clone()))),
            Err(ShowroomError::DuplicateTool(_))
        ));
        assert!(matches!(
            executor.bind("missing", Arc::new(Counting(counter))),
            Err(ShowroomError::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut executor = ToolExecutor::new(registry(&["search"]));
        executor
            .bind("search", Arc::new(Counting(counter.clone())))
            .unwrap();

        let requests = vec![ToolCallRequest::new("c1", "search", r#"{"maxPrice": "cheap"}"#)];
        let results = executor.execute_batch(&requests, &context()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].correlation_id, "c1");
        assert_eq!(results[0].failure_kind(), Some(FailureKind::InvalidArguments));
        assert!(results[0].result_text().contains("maxPrice must be numeric"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_failure_result() {
        let executor = ToolExecutor::new(registry(&["search"]));
        let requests = vec![ToolCallRequest::new("c1", "teleport", "{}")];
        let results = executor.execute_batch(&requests, &context()).await;
        assert_eq!(results[0].failure_kind(), Some(FailureKind::UnknownTool));
    }

    #[tokio::test]
    async fn test_unbound_tool_becomes_failure_result() {
        let executor = ToolExecutor::new(registry(&["search"]));
        let requests = vec![ToolCallRequest::new("c1", "search", "{}")];
        let results = executor.execute_batch(&requests, &context()).await;
        assert_eq!(results[0].failure_kind(), Some(FailureKind::UnknownTool));
    }

    #[tokio::test]
    async fn test_panic_is_isolated_and_not_leaked() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut executor = ToolExecutor::new(registry(&["search", "explode", "refuse"]));
        executor.bind("search", Arc::new(Counting(counter.clone()))).unwrap();
        executor.bind("explode", Arc::new(Panicking)).unwrap();
        executor.bind("refuse", Arc::new(Failing)).unwrap();

        let requests = vec![
            ToolCallRequest::new("a", "explode", "{}"),
            ToolCallRequest::new("b", "search", r#"{"maxPrice": 10}"#),
            ToolCallRequest::new("c", "refuse", "{}"),
        ];
        let results = executor.execute_batch(&requests, &context()).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].failure_kind(), Some(FailureKind::InternalFault));
        assert!(!results[0].result_text().contains("hunter2"));
        assert!(results[1].is_success());
        assert_eq!(results[2].failure_kind(), Some(FailureKind::ToolError));
        assert!(results[2].result_text().contains("not in stock"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_produces_failure() {
        let mut executor =
            ToolExecutor::new(registry(&["slow"])).with_timeout(Duration::from_millis(50));
        executor.bind("slow", Arc::new(Sleeping)).unwrap();

        let requests = vec![ToolCallRequest::new("s1", "slow", "{}")];
        let results = executor.execute_batch(&requests, &context()).await;
        assert_eq!(results[0].failure_kind(), Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_batch_runs_concurrently() {
        let barrier = Arc::new(Barrier::new(2));
        let mut executor =
            ToolExecutor::new(registry(&["left", "right"])).with_timeout(Duration::from_secs(5));
        executor.bind("left", Arc::new(Rendezvous(barrier.clone()))).unwrap();
        executor.bind("right", Arc::new(Rendezvous(barrier))).unwrap();

        // Sequential execution would block on the barrier until the timeout.
        let requests = vec![
            ToolCallRequest::new("l", "left", "{}"),
            ToolCallRequest::new("r", "right", "{}"),
        ];
        let results = executor.execute_batch(&requests, &context()).await;
        assert!(results.iter().all(ToolCallResult::is_success));
    }

    #[tokio::test]
    async fn test_result_set_is_complete_permutation() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut executor = ToolExecutor::new(registry(&["search", "explode"]));
        executor.bind("search", Arc::new(Counting(counter))).unwrap();
        executor.bind("explode", Arc::new(Panicking)).unwrap();

        let requests: Vec<_> = (0..12)
            .map(|i| match i % 4 {
                0 => ToolCallRequest::new(format!("id-{i}"), "search", r#"{"maxPrice": 1}"#),
                1 => ToolCallRequest::new(format!("id-{i}"), "explode", "{}"),
                2 => ToolCallRequest::new(format!("id-{i}"), "search", "oops"),
                _ => ToolCallRequest::new(format!("id-{i}"), "nope", "{}"),
            })
            .collect();

        let results = executor.execute_batch(&requests, &context()).await;

        assert_eq!(results.len(), requests.len());
        let ids: HashSet<_> = results.iter().map(|r| r.correlation_id.as_str()).collect();
        let expected: HashSet<_> = requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, expected);
        for (request, result) in requests.iter().zip(&results) {
            assert_eq!(request.id, result.correlation_id);
            assert_eq!(request.tool_name, result.tool_name);
        }
    }
}
