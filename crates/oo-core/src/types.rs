//! Request and response models for the Ouroboros Compute API
//!
//! Every response model keeps the fields it does not know about in an
//! `extra` map, so a server that grows its schema never breaks the client.

use crate::error::OoError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// JSON object as used for free-form inputs and configs
pub type JsonMap = serde_json::Map<String, Value>;

// ============================================================================
// Execution lifecycle
// ============================================================================

/// Lifecycle state of a server-side execution
///
/// The vocabulary belongs to the server. Anything this client does not
/// recognize is kept verbatim in `Other` and treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "String")]
pub enum ExecutionState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl ExecutionState {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionState::Pending => "pending",
            ExecutionState::Running => "running",
            ExecutionState::Completed => "completed",
            ExecutionState::Failed => "failed",
            ExecutionState::Cancelled => "cancelled",
            ExecutionState::Other(s) => s,
        }
    }

    /// No further progress will happen after a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }
}

impl From<&str> for ExecutionState {
    fn from(s: &str) -> Self {
        match s {
            "pending" => ExecutionState::Pending,
            "running" => ExecutionState::Running,
            "completed" => ExecutionState::Completed,
            "failed" => ExecutionState::Failed,
            "cancelled" => ExecutionState::Cancelled,
            other => ExecutionState::Other(other.to_string()),
        }
    }
}

impl From<Value> for ExecutionState {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ExecutionState::from(s.as_str()),
            Value::Null => ExecutionState::Other(String::new()),
            other => ExecutionState::Other(other.to_string()),
        }
    }
}

impl From<ExecutionState> for String {
    fn from(state: ExecutionState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response of `GET /executions/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ExecutionStatus {
    /// Read a status payload field by field
    ///
    /// Only a non-object payload is an error. An `execution_id` of any JSON
    /// type is kept as text, so an odd field never hides the state.
    pub fn from_payload(value: Value) -> crate::Result<Self> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(OoError::MalformedResponse {
                    status: 200,
                    message: format!("Execution status is not a JSON object: {}", other),
                })
            }
        };

        let execution_id = match map.remove("execution_id") {
            Some(Value::String(id)) => Some(id),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let status = map
            .remove("status")
            .filter(|s| !s.is_null())
            .map(ExecutionState::from);
        let error = map.remove("error");

        Ok(Self {
            execution_id,
            status,
            error,
            extra: map,
        })
    }

    /// Reported state; a missing status reads as an unknown, non-terminal state
    pub fn state(&self) -> ExecutionState {
        self.status
            .clone()
            .unwrap_or_else(|| ExecutionState::Other(String::new()))
    }

    /// Human-readable failure reason taken from the `error` field
    pub fn failure_reason(&self) -> String {
        match &self.error {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            Some(Value::Null) | None => "Unknown error".to_string(),
            Some(Value::String(_)) => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

// ============================================================================
// Error envelope
// ============================================================================

/// Any JSON value where text is expected; non-strings keep their JSON form
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Server-side diagnostic block attached to failed executions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetails {
    #[serde(deserialize_with = "lenient_text")]
    pub exception_type: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub exception_message: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub graph_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub workflow_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub error_category: Option<String>,
    /// Kept as text even when the server sends epoch seconds
    #[serde(deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub full_stack_trace: Option<String>,
    pub traceback_lines: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Shape of an error response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorEnvelope {
    pub error: Option<Value>,
    pub message: Option<Value>,
    pub error_details: Option<ErrorDetails>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ErrorEnvelope {
    /// Message for a failed HTTP response
    ///
    /// With an `error` key present only `error.message` is consulted;
    /// without one the top-level `message` is used. Anything else falls back
    /// to `"Request failed with status <code>"`.
    pub fn message_for_status(status: u16, body: Option<&Value>) -> String {
        let fallback = || format!("Request failed with status {}", status);

        let Some(Value::Object(obj)) = body else {
            return fallback();
        };

        match obj.get("error") {
            Some(error) => error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(fallback),
            None => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(fallback),
        }
    }

    /// Message for a 2xx envelope carrying `"success": false`
    ///
    /// Read straight from the body: a string `error`, then `error.message`,
    /// then `message`, else `"Unknown error"`.
    pub fn rejection_message(body: &Value) -> String {
        let error = body.get("error");
        error
            .and_then(Value::as_str)
            .or_else(|| error.and_then(|e| e.get("message")).and_then(Value::as_str))
            .or_else(|| body.get("message").and_then(Value::as_str))
            .unwrap_or("Unknown error")
            .to_string()
    }
}

// ============================================================================
// Health
// ============================================================================

/// Response of `GET /health`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub success: Option<bool>,
    pub status: Option<String>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl HealthReport {
    /// Healthy when the server reports `success: true` or `status: "healthy"`
    pub fn is_healthy(&self) -> bool {
        self.success == Some(true) || self.status.as_deref() == Some("healthy")
    }
}

/// Health of a single server component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentHealth {
    pub healthy: bool,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Response of `GET /service/health`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceHealth {
    pub healthy: bool,
    pub components: BTreeMap<String, ComponentHealth>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

// ============================================================================
// Discovery
// ============================================================================

/// A graph as listed by `GET /graphs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSummary {
    pub name: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub module_path: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl GraphSummary {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    pub fn is_available(&self) -> bool {
        self.status.as_deref() == Some("available")
    }
}

/// Response of `GET /graphs/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDetails {
    pub success: Option<bool>,
    pub graph_info: Option<GraphSummary>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// A workflow as listed by `GET /workflows`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSummary {
    pub name: Option<String>,
    pub workflow_id: Option<String>,
    #[serde(rename = "_id")]
    pub document_id: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub asis_compatible: bool,
    pub input_schema: Option<Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// One entry of a workflow's declared input schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub field_type: String,
    pub required: bool,
}

impl WorkflowSummary {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// `workflow_id`, falling back to the storage `_id`
    pub fn id(&self) -> &str {
        self.workflow_id
            .as_deref()
            .or(self.document_id.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }

    /// Declared input schema, when it is an object of field specs
    pub fn schema_fields(&self) -> Vec<SchemaField> {
        let Some(Value::Object(schema)) = &self.input_schema else {
            return Vec::new();
        };

        schema
            .iter()
            .map(|(name, spec)| SchemaField {
                name: name.clone(),
                field_type: spec
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                required: spec
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
            .collect()
    }
}

/// Response of `GET /workflows/{slug}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowDetails {
    pub success: Option<bool>,
    pub workflow: Option<WorkflowSummary>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

// ============================================================================
// Workflow inputs
// ============================================================================

/// An input field declared by a workflow
///
/// The server has used two naming schemes over time (`field_name` vs
/// `name`, `is_required` vs `required`, ...). Both are accepted and the
/// accessors prefer the newer one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputField {
    pub field_name: Option<String>,
    pub name: Option<String>,
    pub field_type: Option<String>,
    #[serde(rename = "type")]
    pub legacy_type: Option<String>,
    pub is_required: Option<bool>,
    pub required: Option<bool>,
    pub field_description: Option<String>,
    pub description: Option<String>,
    pub ui_options: Option<Value>,
    pub example: Option<Value>,
    pub default_value: Option<Value>,
    pub default: Option<Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl InputField {
    pub fn key(&self) -> &str {
        self.field_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("unknown")
    }

    pub fn kind(&self) -> &str {
        self.field_type
            .as_deref()
            .or(self.legacy_type.as_deref())
            .unwrap_or("string")
    }

    pub fn is_required(&self) -> bool {
        self.is_required.or(self.required).unwrap_or(false)
    }

    pub fn describe(&self) -> Option<&str> {
        self.field_description
            .as_deref()
            .or(self.description.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// First example from `ui_options.examples`, else the `example` field
    pub fn example(&self) -> Option<String> {
        let from_ui = self
            .ui_options
            .as_ref()
            .and_then(|ui| ui.get("examples"))
            .and_then(Value::as_array)
            .and_then(|examples| examples.first())
            .and_then(|first| first.get("value"))
            .cloned();

        from_ui
            .or_else(|| self.example.clone())
            .and_then(non_empty)
            .map(|v| display_value(&v))
    }

    /// Default value, treating `null` and `""` as absent
    pub fn default_value(&self) -> Option<Value> {
        self.default_value
            .clone()
            .and_then(non_empty)
            .or_else(|| self.default.clone().and_then(non_empty))
    }
}

fn non_empty(value: Value) -> Option<Value> {
    match &value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        _ => Some(value),
    }
}

/// Render a JSON value for humans: strings without quotes, the rest as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Response of `GET /workflows/{slug}/input-fields`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFields {
    pub success: Option<bool>,
    pub input_fields: Vec<InputField>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Response of `POST /workflows/{slug}/validate-input`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationResult {
    pub success: Option<bool>,
    pub valid: Option<bool>,
    pub errors: Option<Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ValidationResult {
    /// The server processed the validation request
    pub fn was_checked(&self) -> bool {
        self.success == Some(true)
    }

    /// A missing `valid` flag counts as valid
    pub fn is_valid(&self) -> bool {
        self.valid.unwrap_or(true)
    }

    /// Errors reported for `field`, or a generic message
    pub fn field_errors(&self, field: &str) -> Vec<String> {
        let messages = self
            .errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .map(|entry| match entry {
                Value::Array(items) => items.iter().map(display_value).collect(),
                other => vec![display_value(other)],
            })
            .unwrap_or_default();

        if messages.is_empty() {
            vec!["Invalid input".to_string()]
        } else {
            messages
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Body of `POST /graphs/{name}/execute`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphExecutionRequest {
    pub input_state: JsonMap,
    pub system_kwargs: JsonMap,
}

/// Body of `POST /workflows/{slug}/execute`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowExecutionRequest {
    pub input_values: JsonMap,
    pub async_execution: bool,
    pub asis_context: JsonMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_workspace_dir: Option<String>,
}

/// Body of `POST /workflows/{slug}/validate-input`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateInputRequest {
    pub user_input: JsonMap,
}

/// Body of `POST /executions/{id}/cancel`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graceful: Option<bool>,
}

impl CancelRequest {
    /// A reason makes the cancellation graceful; no reason sends `{}`
    pub fn new(reason: Option<&str>) -> Self {
        match reason {
            Some(reason) => Self {
                reason: Some(reason.to_string()),
                graceful: Some(true),
            },
            None => Self::default(),
        }
    }
}

/// Body of `POST /mcp-tools/execute`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpToolRequest {
    pub tool_id: String,
    pub input: JsonMap,
    pub config: JsonMap,
}

/// Inner block of an execution response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionResult {
    pub execution_id: Option<String>,
    pub status: Option<ExecutionState>,
    pub graph_name: Option<String>,
    pub execution_time: Option<Value>,
    pub success: Option<bool>,
    pub result: Option<Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Response of the graph and workflow execute endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionResponse {
    pub success: Option<bool>,
    pub execution_result: Option<ExecutionResult>,
    pub workflow_name: Option<String>,
    pub message: Option<String>,
    pub error: Option<Value>,
    pub error_details: Option<ErrorDetails>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ExecutionResponse {
    pub fn execution_id(&self) -> Option<&str> {
        self.execution_result
            .as_ref()
            .and_then(|r| r.execution_id.as_deref())
    }
}
