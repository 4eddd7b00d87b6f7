//! Typed wrappers for every Ouroboros Compute API endpoint

use crate::clock::{Clock, TokioClock};
use crate::dispatcher::{RequestDispatcher, RetryPolicy};
use crate::filters::{
    AnalyticsQuery, CheckpointFilter, EventFilter, ExecutionFilter, GraphFilter,
    StepMetricsFilter, WorkflowFilter, WorkspaceFileFilter,
};
use crate::poller::{OperationPoller, PollOptions};
use crate::query::QueryParams;
use crate::transport::{HttpTransport, ReqwestTransport};
use oo_core::{
    CancelRequest, ErrorEnvelope, ExecutionResponse, ExecutionStatus, GraphDetails,
    GraphExecutionRequest, GraphSummary, HealthReport, InputFields, JsonMap, McpToolRequest,
    OoConfig, OoError, Result, ServiceHealth, ValidateInputRequest, ValidationResult,
    WorkflowDetails, WorkflowExecutionRequest, WorkflowSummary,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Client for the Ouroboros Compute API
#[derive(Clone)]
pub struct OuroborosClient {
    dispatcher: RequestDispatcher,
    poller: OperationPoller,
    config: OoConfig,
}

impl OuroborosClient {
    /// Client for `api_url` with default settings
    pub fn new(api_url: &str) -> Result<Self> {
        Self::from_config(OoConfig {
            api_url: api_url.to_string(),
            ..OoConfig::default()
        })
    }

    /// Client over a real HTTP connection pool
    pub fn from_config(config: OoConfig) -> Result<Self> {
        let config = config.validate()?;
        let transport = ReqwestTransport::from_config(&config)?;
        Ok(Self::with_parts(
            Arc::new(transport),
            Arc::new(TokioClock),
            config,
        ))
    }

    /// Client over an explicit transport and clock
    pub fn with_parts(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        config: OoConfig,
    ) -> Self {
        let dispatcher = RequestDispatcher::new(transport, clock, RetryPolicy::from_config(&config));
        let poller = OperationPoller::new(dispatcher.clone());
        Self {
            dispatcher,
            poller,
            config,
        }
    }

    pub fn config(&self) -> &OoConfig {
        &self.config
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Poll settings taken from the configuration
    pub fn poll_options(&self) -> PollOptions {
        PollOptions::from_config(&self.config)
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// True when the API answers and reports itself healthy
    pub async fn check_health(&self) -> bool {
        match self.health().await {
            Ok(report) => report.is_healthy(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let value = self.dispatcher.get("/health", QueryParams::new()).await?;
        decode(value)
    }

    pub async fn service_health(&self) -> Result<ServiceHealth> {
        let value = self
            .dispatcher
            .get("/service/health", QueryParams::new())
            .await?;
        decode(value)
    }

    pub async fn service_metrics(&self) -> Result<Value> {
        self.dispatcher
            .get("/service/metrics", QueryParams::new())
            .await
    }

    // ------------------------------------------------------------------
    // Graphs
    // ------------------------------------------------------------------

    pub async fn list_graphs(&self, filter: &GraphFilter) -> Result<Vec<GraphSummary>> {
        let value = self.dispatcher.get("/graphs", filter.to_query()).await?;
        take_list(value, "graphs")
    }

    pub async fn get_graph(&self, name: &str) -> Result<GraphDetails> {
        let path = format!("/graphs/{}", segment(name)?);
        let value = self.dispatcher.get(&path, QueryParams::new()).await?;
        decode(ensure_success(value)?)
    }

    #[instrument(skip(self, request))]
    pub async fn execute_graph(
        &self,
        name: &str,
        request: &GraphExecutionRequest,
    ) -> Result<ExecutionResponse> {
        let path = format!("/graphs/{}/execute", segment(name)?);
        let value = self.dispatcher.post(&path, Some(encode(request)?)).await?;
        decode(ensure_success(value)?)
    }

    // ------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------

    pub async fn list_workflows(&self, filter: &WorkflowFilter) -> Result<Vec<WorkflowSummary>> {
        let value = self.dispatcher.get("/workflows", filter.to_query()).await?;
        take_list(value, "workflows")
    }

    pub async fn get_workflow(&self, slug: &str) -> Result<WorkflowDetails> {
        let path = format!("/workflows/{}", segment(slug)?);
        let value = self.dispatcher.get(&path, QueryParams::new()).await?;
        decode(ensure_success(value)?)
    }

    pub async fn get_workflow_input_fields(&self, slug: &str) -> Result<InputFields> {
        let path = format!("/workflows/{}/input-fields", segment(slug)?);
        let value = self.dispatcher.get(&path, QueryParams::new()).await?;
        decode(ensure_success(value)?)
    }

    pub async fn get_workflow_misc(&self, slug: &str) -> Result<Value> {
        let path = format!("/workflows/{}/misc", segment(slug)?);
        self.dispatcher.get(&path, QueryParams::new()).await
    }

    /// Ask the server whether `input` is acceptable for the workflow
    pub async fn validate_workflow_input(
        &self,
        slug: &str,
        input: &JsonMap,
    ) -> Result<ValidationResult> {
        let path = format!("/workflows/{}/validate-input", segment(slug)?);
        let body = encode(&ValidateInputRequest {
            user_input: input.clone(),
        })?;
        let value = self.dispatcher.post(&path, Some(body)).await?;
        decode(value)
    }

    #[instrument(skip(self, request))]
    pub async fn execute_workflow(
        &self,
        slug: &str,
        request: &WorkflowExecutionRequest,
    ) -> Result<ExecutionResponse> {
        let path = format!("/workflows/{}/execute", segment(slug)?);
        let value = self.dispatcher.post(&path, Some(encode(request)?)).await?;
        decode(ensure_success(value)?)
    }

    pub async fn get_workflow_steps(&self, slug: &str) -> Result<Value> {
        let path = format!("/workflows/{}/steps", segment(slug)?);
        self.dispatcher.get(&path, QueryParams::new()).await
    }

    pub async fn get_workflow_step(&self, slug: &str, step_number: u32) -> Result<Value> {
        let path = format!("/workflows/{}/steps/{}", segment(slug)?, step_number);
        self.dispatcher.get(&path, QueryParams::new()).await
    }

    pub async fn get_workflow_analytics(&self, slug: &str, window: &AnalyticsQuery) -> Result<Value> {
        let path = format!("/workflows/{}/analytics", segment(slug)?);
        self.dispatcher.get(&path, window.to_query()).await
    }

    // ------------------------------------------------------------------
    // Executions
    // ------------------------------------------------------------------

    pub async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus> {
        let path = format!("/executions/{}", segment(execution_id)?);
        let value = self.dispatcher.get(&path, QueryParams::new()).await?;
        ExecutionStatus::from_payload(value)
    }

    pub async fn get_execution_info(&self, execution_id: &str) -> Result<Value> {
        let path = format!("/executions/{}/info", segment(execution_id)?);
        self.dispatcher.get(&path, QueryParams::new()).await
    }

    pub async fn get_execution_events(
        &self,
        execution_id: &str,
        filter: &EventFilter,
    ) -> Result<Vec<Value>> {
        let path = format!("/executions/{}/events", segment(execution_id)?);
        let value = self.dispatcher.get(&path, filter.to_query()).await?;
        take_list(value, "events")
    }

    /// Cancel a running execution; a reason makes the cancellation graceful
    pub async fn cancel_execution(&self, execution_id: &str, reason: Option<&str>) -> Result<Value> {
        let path = format!("/executions/{}/cancel", segment(execution_id)?);
        let body = encode(&CancelRequest::new(reason))?;
        self.dispatcher.post(&path, Some(body)).await
    }

    pub async fn get_execution_steps(&self, execution_id: &str) -> Result<Vec<Value>> {
        let path = format!("/executions/{}/steps", segment(execution_id)?);
        let value = self.dispatcher.get(&path, QueryParams::new()).await?;
        take_list(value, "step_executions")
    }

    pub async fn list_executions(&self, filter: &ExecutionFilter) -> Result<Vec<Value>> {
        let value = self.dispatcher.get("/executions", filter.to_query()).await?;
        take_list(value, "executions")
    }

    pub async fn get_step_execution(&self, step_execution_id: &str) -> Result<Value> {
        let path = format!("/step-executions/{}", segment(step_execution_id)?);
        self.dispatcher.get(&path, QueryParams::new()).await
    }

    pub async fn cancel_step_execution(&self, step_execution_id: &str) -> Result<Value> {
        let path = format!("/step-executions/{}/cancel", segment(step_execution_id)?);
        self.dispatcher.post(&path, None).await
    }

    pub async fn get_step_execution_metrics(&self, filter: &StepMetricsFilter) -> Result<Value> {
        self.dispatcher
            .get("/metrics/step-executions", filter.to_query())
            .await
    }

    /// Block until the execution finishes, using the configured poll settings
    pub async fn wait_for_execution(&self, execution_id: &str, options: PollOptions) -> Result<Value> {
        segment(execution_id)?;
        self.poller.wait_for_completion(execution_id, options).await
    }

    /// Like `wait_for_execution`, but returns `Interrupted` once `cancel` resolves
    pub async fn wait_for_execution_with_cancel<F>(
        &self,
        execution_id: &str,
        options: PollOptions,
        cancel: F,
    ) -> Result<Value>
    where
        F: Future<Output = ()>,
    {
        segment(execution_id)?;
        self.poller
            .wait_for_completion_with_cancel(execution_id, options, cancel)
            .await
    }

    // ------------------------------------------------------------------
    // MCP
    // ------------------------------------------------------------------

    pub async fn list_mcp_servers(&self) -> Result<Vec<Value>> {
        let value = self.dispatcher.get("/mcp-servers", QueryParams::new()).await?;
        take_list(value, "mcp_servers")
    }

    pub async fn get_mcp_tools(&self, server: Option<&str>) -> Result<Vec<Value>> {
        let query = QueryParams::new().push_opt("server", server);
        let value = self.dispatcher.get("/mcp-servers/tools", query).await?;
        take_list(value, "tools")
    }

    pub async fn get_mcp_status(&self) -> Result<Value> {
        self.dispatcher
            .get("/mcp-servers/status", QueryParams::new())
            .await
    }

    pub async fn execute_mcp_tool(&self, request: &McpToolRequest) -> Result<Value> {
        if request.tool_id.trim().is_empty() {
            return Err(OoError::InvalidInput("tool_id must not be empty".to_string()));
        }
        self.dispatcher
            .post("/mcp-tools/execute", Some(encode(request)?))
            .await
    }

    // ------------------------------------------------------------------
    // Workspace and checkpoints
    // ------------------------------------------------------------------

    pub async fn get_workspace_info(&self) -> Result<Value> {
        self.dispatcher
            .get("/workspace/directories", QueryParams::new())
            .await
    }

    pub async fn list_workspace_files(&self, filter: &WorkspaceFileFilter) -> Result<Vec<Value>> {
        let path = format!("/service/workspaces/{}/files", segment(&filter.workspace)?);
        let value = self.dispatcher.get(&path, filter.to_query()).await?;
        take_list(value, "files")
    }

    pub async fn get_workspace_config(&self) -> Result<Value> {
        self.dispatcher
            .get("/service/workspace-config", QueryParams::new())
            .await
    }

    pub async fn list_checkpoints(&self, filter: &CheckpointFilter) -> Result<Vec<Value>> {
        let value = self
            .dispatcher
            .get("/workflows/checkpoints", filter.to_query())
            .await?;
        take_list(value, "checkpoints")
    }
}

/// Validate an identifier before it is placed in a path
fn segment(id: &str) -> Result<&str> {
    if id.is_empty() {
        return Err(OoError::InvalidInput("identifier must not be empty".to_string()));
    }
    if id.contains(['/', '?', '#']) {
        return Err(OoError::InvalidInput(format!(
            "identifier {:?} must not contain '/', '?' or '#'",
            id
        )));
    }
    Ok(id)
}

/// Reject a 2xx envelope that carries `"success": false`
fn ensure_success(value: Value) -> Result<Value> {
    if value.get("success") == Some(&Value::Bool(false)) {
        return Err(OoError::Rejected {
            message: ErrorEnvelope::rejection_message(&value),
            details: value,
        });
    }
    Ok(value)
}

/// Pull the list stored under `key`; a missing key is an empty list
fn take_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>> {
    let mut value = ensure_success(value)?;
    match value.get_mut(key).map(Value::take) {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(list) => Ok(serde_json::from_value(list)?),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

fn encode<T: Serialize>(body: &T) -> Result<Value> {
    Ok(serde_json::to_value(body)?)
}
