//! Long-running execution poller

use crate::dispatcher::RequestDispatcher;
use crate::query::QueryParams;
use oo_core::{ExecutionState, ExecutionStatus, OoConfig, OoError, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// How often to check and how long to wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(3600),
        }
    }
}

impl PollOptions {
    pub fn from_config(config: &OoConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_wait: config.max_wait(),
        }
    }
}

/// Resource paths for an operation's status and its completed details
#[derive(Debug, Clone, Copy)]
pub struct OperationEndpoints {
    pub status: fn(&str) -> String,
    pub detail: fn(&str) -> String,
}

impl Default for OperationEndpoints {
    fn default() -> Self {
        Self {
            status: |id| format!("/executions/{}", id),
            detail: |id| format!("/executions/{}/info", id),
        }
    }
}

/// Waits for an execution to reach a terminal state
#[derive(Clone)]
pub struct OperationPoller {
    dispatcher: RequestDispatcher,
    endpoints: OperationEndpoints,
}

impl OperationPoller {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self::with_endpoints(dispatcher, OperationEndpoints::default())
    }

    pub fn with_endpoints(dispatcher: RequestDispatcher, endpoints: OperationEndpoints) -> Self {
        Self {
            dispatcher,
            endpoints,
        }
    }

    /// Poll until the operation completes, fails, is cancelled, or `max_wait` passes
    ///
    /// On completion the detail endpoint is fetched once and returned.
    pub async fn wait_for_completion(&self, operation_id: &str, options: PollOptions) -> Result<Value> {
        let clock = self.dispatcher.clock();
        let start = clock.now();
        let status_path = (self.endpoints.status)(operation_id);
        let mut last_state: Option<ExecutionState> = None;

        loop {
            if clock.now().duration_since(start) > options.max_wait {
                return Err(OoError::Timeout {
                    operation_id: operation_id.to_string(),
                    max_wait: options.max_wait,
                });
            }

            let raw = self.dispatcher.get(&status_path, QueryParams::new()).await?;
            let status = ExecutionStatus::from_payload(raw)?;
            let state = status.state();

            if last_state.as_ref() != Some(&state) {
                info!("Execution {} is {}", operation_id, display_state(&state));
                last_state = Some(state.clone());
            }

            match state {
                ExecutionState::Completed => {
                    let detail_path = (self.endpoints.detail)(operation_id);
                    return self.dispatcher.get(&detail_path, QueryParams::new()).await;
                }
                ExecutionState::Failed => {
                    return Err(OoError::OperationFailed {
                        operation_id: operation_id.to_string(),
                        reason: status.failure_reason(),
                    });
                }
                ExecutionState::Cancelled => {
                    return Err(OoError::OperationCancelled {
                        operation_id: operation_id.to_string(),
                    });
                }
                _ => {
                    debug!(
                        "Execution {} not finished, checking again in {:?}",
                        operation_id, options.poll_interval
                    );
                    clock.sleep(options.poll_interval).await;
                }
            }
        }
    }

    /// Like `wait_for_completion`, but gives up as soon as `cancel` resolves
    pub async fn wait_for_completion_with_cancel<F>(
        &self,
        operation_id: &str,
        options: PollOptions,
        cancel: F,
    ) -> Result<Value>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.wait_for_completion(operation_id, options) => result,
            _ = cancel => Err(OoError::Interrupted(format!(
                "Stopped waiting for execution {}",
                operation_id
            ))),
        }
    }
}

fn display_state(state: &ExecutionState) -> &str {
    match state.as_str() {
        "" => "in an unknown state",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::dispatcher::RetryPolicy;
    use crate::transport::{MockTransport, RawResponse, TransportError};
    use serde_json::json;
    use std::sync::Arc;

    fn harness(
        transport: MockTransport,
    ) -> (OperationPoller, Arc<MockTransport>, Arc<MockClock>) {
        let transport = Arc::new(transport);
        let clock = Arc::new(MockClock::new());
        let dispatcher =
            RequestDispatcher::new(transport.clone(), clock.clone(), RetryPolicy::default());
        (OperationPoller::new(dispatcher), transport, clock)
    }

    fn instant(max_wait_secs: u64) -> PollOptions {
        PollOptions {
            poll_interval: Duration::ZERO,
            max_wait: Duration::from_secs(max_wait_secs),
        }
    }

    #[tokio::test]
    async fn test_completes_after_running() {
        let transport = MockTransport::new()
            .with_response(200, json!({"execution_id": "e1", "status": "running"}))
            .with_response(200, json!({"execution_id": "e1", "status": "running"}))
            .with_response(200, json!({"execution_id": "e1", "status": "completed"}))
            .with_response(200, json!({"execution_id": "e1", "result": {"answer": 42}}));
        let (poller, transport, _) = harness(transport);

        let value = poller.wait_for_completion("e1", instant(60)).await.unwrap();

        assert_eq!(value["result"]["answer"], json!(42));
        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/executions/e1",
                "/executions/e1",
                "/executions/e1",
                "/executions/e1/info"
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_carries_reason() {
        let transport = MockTransport::new()
            .with_response(200, json!({"status": "pending"}))
            .with_response(200, json!({"status": "failed", "error": "step 3 exploded"}));
        let (poller, transport, _) = harness(transport);

        let err = poller.wait_for_completion("e2", instant(60)).await.unwrap_err();

        match err {
            OoError::OperationFailed { operation_id, reason } => {
                assert_eq!(operation_id, "e2");
                assert_eq!(reason, "step 3 exploded");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_without_error_field() {
        let (poller, _, _) =
            harness(MockTransport::new().with_response(200, json!({"status": "failed"})));

        let err = poller.wait_for_completion("e3", instant(60)).await.unwrap_err();
        assert_eq!(err.to_string(), "Execution failed: Unknown error");
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() {
        let (poller, transport, _) =
            harness(MockTransport::new().with_response(200, json!({"status": "cancelled"})));

        let err = poller.wait_for_completion("e4", instant(60)).await.unwrap_err();
        assert!(matches!(err, OoError::OperationCancelled { .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_status_keeps_polling() {
        let transport = MockTransport::new()
            .with_response(200, json!({"status": "queued"}))
            .with_response(200, json!({}))
            .with_response(200, json!({"status": "completed"}))
            .with_response(200, json!({"done": true}));
        let (poller, transport, _) = harness(transport);

        let value = poller.wait_for_completion("e5", instant(60)).await.unwrap();
        assert_eq!(value, json!({"done": true}));
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn test_times_out_when_never_terminal() {
        let transport =
            MockTransport::new().always(Ok(RawResponse::json(200, &json!({"status": "running"}))));
        let (poller, transport, clock) = harness(transport);

        let options = PollOptions {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(25),
        };
        let err = poller.wait_for_completion("e6", options).await.unwrap_err();

        assert_eq!(err.to_string(), "Execution timeout after 25 seconds");
        // Fetches at t = 0, 10, 20; the check at t = 30 gives up
        assert_eq!(transport.call_count(), 3);
        assert_eq!(clock.total_slept(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_deadline_is_strict() {
        let transport =
            MockTransport::new().always(Ok(RawResponse::json(200, &json!({"status": "running"}))));
        let (poller, transport, _) = harness(transport);

        let options = PollOptions {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(20),
        };
        let err = poller.wait_for_completion("e7", options).await.unwrap_err();

        assert!(matches!(err, OoError::Timeout { .. }));
        // Elapsed exactly 20s is still within the deadline
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_completed_with_numeric_execution_id() {
        let transport = MockTransport::new()
            .with_response(200, json!({"execution_id": 42, "status": "completed"}))
            .with_response(200, json!({"execution_id": 42, "result": "done"}));
        let (poller, transport, clock) = harness(transport);

        let options = PollOptions {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(20),
        };
        let value = poller.wait_for_completion("e1", options).await.unwrap();

        assert_eq!(value["result"], json!("done"));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.requests()[1].path, "/executions/e1/info");
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_non_object_status_aborts_wait() {
        let transport =
            MockTransport::new().always(Ok(RawResponse::json(200, &json!("completed"))));
        let (poller, transport, _) = harness(transport);

        let err = poller.wait_for_completion("e9", instant(60)).await.unwrap_err();
        assert!(matches!(err, OoError::MalformedResponse { .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_failure_aborts_wait() {
        let transport = MockTransport::new()
            .with_response(200, json!({"status": "running"}))
            .with_response(404, json!({"message": "Execution not found"}));
        let (poller, _, _) = harness(transport);

        let err = poller.wait_for_completion("e8", instant(60)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancel_future_interrupts_wait() {
        let transport = MockTransport::new().always(Err(TransportError::Connect(
            "refused".to_string(),
        )));
        let (poller, _, _) = harness(transport);

        let err = poller
            .wait_for_completion_with_cancel("e9", PollOptions::default(), async {})
            .await
            .unwrap_err();

        assert!(matches!(err, OoError::Interrupted(_)));
    }

    #[tokio::test]
    async fn test_cancel_that_never_fires() {
        let transport = MockTransport::new()
            .with_response(200, json!({"status": "completed"}))
            .with_response(200, json!({"ok": true}));
        let (poller, _, _) = harness(transport);

        let value = poller
            .wait_for_completion_with_cancel("e10", instant(60), std::future::pending())
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
    }
}
