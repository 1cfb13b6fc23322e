//! Bounded retry with exponential backoff for gateway calls

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::core::config::RetryConfig;
use crate::llm::traits::{GatewayError, GatewayReply, ModelGateway};
use crate::llm::wire::ChatRequest;

/// How many times, and how patiently, a gateway call is attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Retry immediately, for tests and in-process gateways
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u32 << exponent;
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        let spread = (delay.as_millis() / 4) as u64;
        if spread == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::rng().random_range(0..=spread))
    }

    /// Call the gateway until it succeeds, fails permanently, or attempts run out
    pub async fn complete(
        &self,
        gateway: &dyn ModelGateway,
        request: &ChatRequest,
    ) -> Result<GatewayReply, GatewayError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match gateway.complete(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if !e.is_retryable() || attempt >= self.max_attempts => {
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.jittered(attempt - 1);
                    warn!(
                        gateway = gateway.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        kind = e.kind(),
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "gateway call failed; retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedGateway;
    use crate::llm::wire::WireMessage;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![WireMessage::user("hello")], Vec::new())
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(350));
        assert_eq!(policy.backoff(30), Duration::from_millis(350));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let gateway = ScriptedGateway::new([
            Err(GatewayError::Timeout),
            Ok(GatewayReply::answered("ok")),
        ]);
        let reply = RetryPolicy::immediate(3)
            .complete(&gateway, &request())
            .await
            .unwrap();
        assert_eq!(reply.text.as_deref(), Some("ok"));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_stops_after_budget() {
        let gateway = ScriptedGateway::repeating(Err(GatewayError::Timeout));
        let err = RetryPolicy::immediate(3)
            .complete(&gateway, &request())
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Timeout);
        assert_eq!(gateway.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let gateway = ScriptedGateway::repeating(Err(GatewayError::Status {
            status: 401,
            body: "bad key".to_string(),
        }));
        let err = RetryPolicy::immediate(3)
            .complete(&gateway, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 401, .. }));
        assert_eq!(gateway.calls(), 1);
    }
}
