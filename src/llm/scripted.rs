//! Scripted gateway
//!
//! Replays canned replies in order and records every request it receives.
//! Used to drive the orchestrator deterministically without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::traits::{GatewayError, GatewayReply, ModelGateway};
use crate::llm::wire::ChatRequest;

type Scripted = Result<GatewayReply, GatewayError>;

/// In-process gateway with a fixed script
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Scripted>>,
    /// Returned once the script runs out
    repeat: Option<Scripted>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    /// Replay `replies` once each; later calls fail with NoUsableContent
    pub fn new(replies: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Return the same reply on every call
    pub fn repeating(reply: Scripted) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::default()
        }
    }

    /// Number of calls received
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every request received, in call order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(&self, request: &ChatRequest) -> Result<GatewayReply, GatewayError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match (next, &self.repeat) {
            (Some(reply), _) => reply,
            (None, Some(reply)) => reply.clone(),
            (None, None) => Err(GatewayError::NoUsableContent(
                "scripted gateway has no more replies".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
