//! Retrying request dispatcher
//!
//! Only failures where no HTTP response arrived are retried. Any response
//! the server actually sent, including 5xx, is final.

use crate::clock::{Clock, TokioClock};
use crate::query::QueryParams;
use crate::transport::{ApiRequest, HttpTransport, Method, RawResponse, ReqwestTransport};
use oo_core::{ErrorEnvelope, OoConfig, OoError, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &OoConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Sends endpoint calls through a transport, retrying transient failures
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl RequestDispatcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            clock,
            policy,
        }
    }

    /// Dispatcher over a real HTTP connection pool
    pub fn from_config(config: &OoConfig) -> Result<Self> {
        let transport = ReqwestTransport::from_config(config)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(TokioClock),
            RetryPolicy::from_config(config),
        ))
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn get(&self, path: &str, query: QueryParams) -> Result<Value> {
        self.execute(Method::Get, path, None, query).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        self.execute(Method::Post, path, body, QueryParams::default())
            .await
    }

    /// Perform one endpoint call
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: QueryParams,
    ) -> Result<Value> {
        let mut request = ApiRequest::new(method, path).with_query(query);
        request.body = body;
        self.dispatch(&request).await
    }

    /// Send `request`, retrying while no response arrives
    pub async fn dispatch(&self, request: &ApiRequest) -> Result<Value> {
        let mut attempt: u32 = 0;

        loop {
            debug!(
                "{} {} (attempt {})",
                request.method,
                request.path,
                attempt + 1
            );

            match self.transport.send(request).await {
                Ok(response) => return interpret(response),
                Err(err) if attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        "Request {} {} failed: {}. Retrying in {:?} ({}/{})",
                        request.method,
                        request.path,
                        err,
                        delay,
                        attempt,
                        self.policy.max_retries
                    );
                    self.clock.sleep(delay).await;
                }
                Err(err) => {
                    return Err(OoError::Network {
                        message: err.to_string(),
                        attempts: attempt + 1,
                    });
                }
            }
        }
    }
}

/// Turn a received response into a payload or a permanent error
fn interpret(response: RawResponse) -> Result<Value> {
    let parsed = serde_json::from_slice::<Value>(&response.body);

    if response.status >= 400 {
        let details = parsed.ok();
        let message = ErrorEnvelope::message_for_status(response.status, details.as_ref());
        return Err(OoError::Application {
            status: response.status,
            message,
            details: details.unwrap_or_else(|| Value::Object(Default::default())),
        });
    }

    parsed.map_err(|e| OoError::MalformedResponse {
        status: response.status,
        message: format!("Response body is not valid JSON: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::transport::{MockTransport, TransportError};
    use serde_json::json;

    fn harness(
        transport: MockTransport,
        max_retries: u32,
    ) -> (RequestDispatcher, Arc<MockTransport>, Arc<MockClock>) {
        let transport = Arc::new(transport);
        let clock = Arc::new(MockClock::new());
        let dispatcher = RequestDispatcher::new(
            transport.clone(),
            clock.clone(),
            RetryPolicy {
                max_retries,
                base_delay: Duration::from_secs(1),
            },
        );
        (dispatcher, transport, clock)
    }

    fn refused() -> TransportError {
        TransportError::Connect("connection refused".to_string())
    }

    #[tokio::test]
    async fn test_retry_ceiling() {
        for max_retries in [0, 1, 3, 5] {
            let (dispatcher, transport, _) =
                harness(MockTransport::new().always(Err(refused())), max_retries);

            let err = dispatcher.get("/health", QueryParams::new()).await.unwrap_err();

            assert_eq!(transport.call_count(), max_retries as usize + 1);
            match err {
                OoError::Network { attempts, message } => {
                    assert_eq!(attempts, max_retries + 1);
                    assert!(message.contains("connection refused"));
                }
                other => panic!("expected network error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_backoff_doubles() {
        let (dispatcher, _, clock) = harness(MockTransport::new().always(Err(refused())), 3);

        let _ = dispatcher.get("/graphs", QueryParams::new()).await;

        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(clock.total_slept(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let transport = MockTransport::new()
            .with_error(TransportError::Timeout("slow".to_string()))
            .with_error(TransportError::Body("truncated".to_string()))
            .with_response(200, json!({"success": true}));
        let (dispatcher, transport, clock) = harness(transport, 3);

        let value = dispatcher.get("/health", QueryParams::new()).await.unwrap();

        assert_eq!(value, json!({"success": true}));
        assert_eq!(transport.call_count(), 3);
        assert_eq!(clock.total_slept(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_http_errors_are_not_retried() {
        for status in [404u16, 500, 503] {
            let transport = MockTransport::new()
                .with_response(status, json!({"message": "nope"}))
                .always(Ok(RawResponse::json(200, &json!({}))));
            let (dispatcher, transport, clock) = harness(transport, 3);

            let err = dispatcher
                .get("/workflows/missing", QueryParams::new())
                .await
                .unwrap_err();

            assert_eq!(transport.call_count(), 1);
            assert!(clock.sleeps().is_empty());
            assert_eq!(err.status_code(), Some(status));
            assert_eq!(err.to_string(), format!("API Error [{}]: nope", status));
        }
    }

    #[tokio::test]
    async fn test_error_message_precedence() {
        let cases = [
            (json!({"error": {"message": "bad field"}}).to_string(), "bad field"),
            (json!({"message": "oops"}).to_string(), "oops"),
            (String::new(), "Request failed with status 400"),
            ("<html>Bad Request</html>".to_string(), "Request failed with status 400"),
        ];

        for (body, expected) in cases {
            let (dispatcher, _, _) =
                harness(MockTransport::new().with_raw_response(400, &body), 3);
            let err = dispatcher.post("/graphs/x/execute", None).await.unwrap_err();

            match err {
                OoError::Application {
                    status,
                    message,
                    details,
                } => {
                    assert_eq!(status, 400);
                    assert_eq!(message, expected);
                    if body.is_empty() || body.starts_with('<') {
                        assert_eq!(details, json!({}));
                    }
                }
                other => panic!("expected application error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_unparsable_success_body_is_malformed() {
        let (dispatcher, transport, _) =
            harness(MockTransport::new().with_raw_response(200, "OK"), 3);

        let err = dispatcher.get("/health", QueryParams::new()).await.unwrap_err();

        assert!(matches!(err, OoError::MalformedResponse { status: 200, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_request_shape_is_forwarded() {
        let (dispatcher, transport, _) =
            harness(MockTransport::new().with_response(200, json!({})), 3);

        dispatcher
            .execute(
                Method::Post,
                "/workflows/demo/execute",
                Some(json!({"input_values": {}})),
                QueryParams::new().push("limit", 5u32),
            )
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.path, "/workflows/demo/execute");
        assert_eq!(sent.body, Some(json!({"input_values": {}})));
        assert_eq!(sent.query.get("limit").as_deref(), Some("5"));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert!(policy.delay_for(200) >= Duration::from_secs(u32::MAX as u64));
    }
}
