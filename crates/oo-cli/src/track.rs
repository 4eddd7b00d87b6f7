//! Health, execution tracking, MCP and workspace commands

use crate::display::{pretty, status_icon, truncate};
use crate::input::{load_input_file, parse_input_vars};
use crate::run::poll_options;
use anyhow::Result;
use colored::Colorize;
use oo_client::filters::{CheckpointFilter, EventFilter, ExecutionFilter, WorkspaceFileFilter};
use oo_client::{OuroborosClient, PollOptions};
use oo_core::{display_value, ExecutionState, JsonMap, McpToolRequest};
use serde_json::Value;
use std::path::Path;

pub async fn cmd_health(client: &OuroborosClient) -> Result<bool> {
    println!("🏥 Checking API health at {}...", client.api_url());

    let report = match client.health().await {
        Ok(report) => report,
        Err(e) => {
            println!("{} {}", "❌ Health check failed:".red(), e);
            return Ok(false);
        }
    };

    let healthy = report.is_healthy();
    println!(
        "{} API is {}",
        status_icon(healthy),
        if healthy { "healthy".green() } else { "unhealthy".red() }
    );
    if let Some(status) = &report.status {
        println!("   Status: {}", status);
    }
    if let Some(message) = &report.message {
        println!("   Message: {}", message);
    }

    match client.service_health().await {
        Ok(service) => {
            println!("\n🔧 Service components:");
            for (name, component) in &service.components {
                let message = component.message.as_deref().unwrap_or("");
                println!("   {} {} {}", status_icon(component.healthy), name, message.dimmed());
            }
            if service.components.is_empty() {
                println!("   {} service reports healthy={}", status_icon(service.healthy), service.healthy);
            }
        }
        Err(e) => tracing::warn!("Service health unavailable: {}", e),
    }

    Ok(healthy)
}

pub async fn cmd_status(client: &OuroborosClient, id: &str) -> Result<bool> {
    let status = client.get_execution_status(id).await?;
    let state = status.state();

    println!("📊 Execution {}", id.bright_cyan());
    println!("   Status: {}", colored_state(&state));
    if state == ExecutionState::Failed {
        println!("   Reason: {}", status.failure_reason());
    }
    for (key, value) in &status.extra {
        if !value.is_null() {
            println!("   {}: {}", key, truncate(&display_value(value), 120));
        }
    }

    Ok(true)
}

pub async fn cmd_wait(
    client: &OuroborosClient,
    id: &str,
    poll_interval: Option<u64>,
    max_wait: Option<u64>,
    output: Option<&Path>,
) -> Result<bool> {
    let options = poll_options(client, poll_interval, max_wait);
    println!(
        "⏳ Waiting for execution {} (every {}s, up to {}s)...",
        id.bright_cyan(),
        options.poll_interval.as_secs(),
        options.max_wait.as_secs()
    );

    let result = wait_interruptibly(client, id, options).await?;
    println!("{} Execution {} completed", "✅".green(), id);
    println!("{}", pretty(&result));

    if let Some(path) = output {
        save_result(path, &result);
    }
    Ok(true)
}

/// Wait for an execution; Ctrl-C stops waiting with `Interrupted`
pub async fn wait_interruptibly(
    client: &OuroborosClient,
    id: &str,
    options: PollOptions,
) -> oo_core::Result<Value> {
    client
        .wait_for_execution_with_cancel(id, options, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

/// Write `result` as pretty JSON; a failure is reported, not returned
pub fn save_result(path: &Path, result: &Value) {
    match std::fs::write(path, pretty(result)) {
        Ok(()) => println!("💾 Results saved to: {}", path.display()),
        Err(e) => println!(
            "{} {}: {}",
            "⚠️  Failed to save results to".yellow(),
            path.display(),
            e
        ),
    }
}

pub async fn cmd_cancel(client: &OuroborosClient, id: &str, reason: Option<&str>) -> Result<bool> {
    let response = client.cancel_execution(id, reason).await?;
    println!("🛑 Cancellation requested for {}", id.bright_cyan());
    if let Some(message) = field(&response, &["message", "status"]) {
        println!("   {}", message);
    }
    Ok(true)
}

pub async fn cmd_events(
    client: &OuroborosClient,
    id: &str,
    event_type: Option<String>,
    limit: u32,
) -> Result<bool> {
    let filter = EventFilter {
        limit,
        event_type,
        ..EventFilter::default()
    };
    let events = client.get_execution_events(id, &filter).await?;

    println!("📜 Events for {} ({}):", id.bright_cyan(), events.len());
    for event in &events {
        println!(
            "   {} {} {}",
            field(event, &["timestamp", "created_at"]).unwrap_or_default().dimmed(),
            field(event, &["event_type", "type"]).unwrap_or_else(|| "event".to_string()),
            truncate(
                &field(event, &["message", "event_data", "data"]).unwrap_or_default(),
                100
            )
        );
    }
    Ok(true)
}

pub async fn cmd_steps(client: &OuroborosClient, id: &str) -> Result<bool> {
    let steps = client.get_execution_steps(id).await?;

    println!("🪜 Steps for {} ({}):", id.bright_cyan(), steps.len());
    for step in &steps {
        let state = state_of(step);
        println!(
            "   {:>3}. {} [{}] {}",
            field(step, &["step_number", "step_order"]).unwrap_or_else(|| "-".to_string()),
            field(step, &["step_name", "name", "step_id"]).unwrap_or_else(|| "unnamed".to_string()),
            colored_state(&state),
            field(step, &["execution_time", "duration"])
                .map(|t| format!("{}s", t))
                .unwrap_or_default()
        );
    }
    Ok(true)
}

pub async fn cmd_executions(
    client: &OuroborosClient,
    workflow: Option<String>,
    status: Option<String>,
    limit: u32,
) -> Result<bool> {
    let filter = ExecutionFilter {
        limit,
        workflow_slug: workflow,
        status,
    };
    let executions = client.list_executions(&filter).await?;

    if executions.is_empty() {
        println!("No executions found");
        return Ok(true);
    }

    println!("🗂  Executions ({}):", executions.len());
    for execution in &executions {
        let state = state_of(execution);
        println!(
            "   {} {} [{}] {}",
            field(execution, &["execution_id", "id"]).unwrap_or_default().bright_cyan(),
            field(execution, &["workflow_slug", "workflow_name", "graph_name"]).unwrap_or_default(),
            colored_state(&state),
            field(execution, &["started_at", "created_at"]).unwrap_or_default().dimmed()
        );
    }
    Ok(true)
}

pub async fn cmd_checkpoints(
    client: &OuroborosClient,
    workflow: Option<String>,
    execution: Option<String>,
    limit: u32,
) -> Result<bool> {
    let filter = CheckpointFilter {
        limit,
        workflow_slug: workflow,
        execution_id: execution,
        ..CheckpointFilter::default()
    };
    let checkpoints = client.list_checkpoints(&filter).await?;

    if checkpoints.is_empty() {
        println!("No checkpoints found");
        return Ok(true);
    }

    println!("📌 Checkpoints ({}):", checkpoints.len());
    for checkpoint in &checkpoints {
        println!(
            "   {} {} step {} {}",
            field(checkpoint, &["checkpoint_id", "id"]).unwrap_or_default().bright_cyan(),
            field(checkpoint, &["workflow_slug", "workflow_name"]).unwrap_or_default(),
            field(checkpoint, &["step_number", "step_name"]).unwrap_or_else(|| "-".to_string()),
            field(checkpoint, &["created_at", "timestamp"]).unwrap_or_default().dimmed()
        );
    }
    Ok(true)
}

pub async fn cmd_mcp_servers(client: &OuroborosClient) -> Result<bool> {
    let servers = client.list_mcp_servers().await?;

    println!("🔌 MCP Servers ({}):", servers.len());
    for server in &servers {
        let enabled = server
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| field(server, &["status"]).as_deref() != Some("error"));
        println!(
            "   {} {} {}",
            status_icon(enabled),
            field(server, &["name", "server_name", "id"]).unwrap_or_default().bright_cyan(),
            field(server, &["status", "transport"]).unwrap_or_default().dimmed()
        );
    }
    Ok(true)
}

pub async fn cmd_mcp_tools(client: &OuroborosClient, server: Option<&str>) -> Result<bool> {
    let tools = client.get_mcp_tools(server).await?;

    match server {
        Some(server) => println!("🧰 MCP Tools on {} ({}):", server, tools.len()),
        None => println!("🧰 MCP Tools ({}):", tools.len()),
    }
    for tool in &tools {
        println!(
            "   {} - {}",
            field(tool, &["tool_id", "id", "name"]).unwrap_or_default().bright_cyan(),
            truncate(
                &field(tool, &["description"]).unwrap_or_else(|| "No description".to_string()),
                80
            )
        );
    }
    Ok(true)
}

pub async fn cmd_mcp_exec(
    client: &OuroborosClient,
    tool_id: String,
    input: Option<&Path>,
    input_vars: &[String],
) -> Result<bool> {
    let input: JsonMap = match input {
        Some(path) => load_input_file(path)?,
        None => parse_input_vars(input_vars)?,
    };

    println!("🔧 Executing MCP tool: {}", tool_id.bright_cyan());
    let request = McpToolRequest {
        tool_id,
        input,
        ..McpToolRequest::default()
    };
    let result = client.execute_mcp_tool(&request).await?;
    println!("{}", pretty(&result));
    Ok(true)
}

pub async fn cmd_workspace_files(
    client: &OuroborosClient,
    name: String,
    directory: Option<String>,
    extension: Option<String>,
    limit: u32,
) -> Result<bool> {
    let filter = WorkspaceFileFilter {
        workspace: name,
        limit,
        directory,
        extension,
    };
    let files = client.list_workspace_files(&filter).await?;

    println!("📁 Files in workspace {} ({}):", filter.workspace.bright_cyan(), files.len());
    for file in &files {
        println!(
            "   {} {}",
            field(file, &["path", "name", "filename"]).unwrap_or_default(),
            field(file, &["size"]).map(|s| format!("({} bytes)", s)).unwrap_or_default().dimmed()
        );
    }
    Ok(true)
}

pub fn cmd_print(value: Value) -> Result<bool> {
    println!("{}", pretty(&value));
    Ok(true)
}

/// First non-null value among `keys`, rendered for display
fn field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
        .map(display_value)
}

fn state_of(value: &Value) -> ExecutionState {
    ExecutionState::from(value.get("status").cloned().unwrap_or(Value::Null))
}

fn colored_state(state: &ExecutionState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        ExecutionState::Completed => text.green(),
        ExecutionState::Failed => text.red(),
        ExecutionState::Cancelled => text.yellow(),
        ExecutionState::Running | ExecutionState::Pending => text.cyan(),
        ExecutionState::Other(_) => text.normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oo_client::{MockClock, MockTransport};
    use oo_core::OoConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: MockTransport) -> (OuroborosClient, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let client = OuroborosClient::with_parts(
            transport.clone(),
            Arc::new(MockClock::new()),
            OoConfig::default(),
        );
        (client, transport)
    }

    #[test]
    fn test_field_picks_first_present_key() {
        let event = json!({"type": null, "event_type": "step_started", "count": 3});
        assert_eq!(field(&event, &["type", "event_type"]), Some("step_started".to_string()));
        assert_eq!(field(&event, &["count"]), Some("3".to_string()));
        assert_eq!(field(&event, &["missing"]), None);
    }

    #[test]
    fn test_save_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        save_result(&path, &json!({"status": "completed"}));

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, json!({"status": "completed"}));

        // Unwritable target only warns
        save_result(&dir.path().join("missing").join("result.json"), &json!({}));
    }

    #[tokio::test]
    async fn test_health_reports_unhealthy() {
        let (api, transport) = client(
            MockTransport::new()
                .with_response(200, json!({"success": false, "status": "degraded"}))
                .with_response(200, json!({"healthy": false, "components": {}})),
        );
        assert!(!cmd_health(&api).await.unwrap());
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_health_survives_missing_service_health() {
        let (api, _) = client(
            MockTransport::new()
                .with_response(200, json!({"status": "healthy"}))
                .with_response(404, json!({"message": "Not found"})),
        );
        assert!(cmd_health(&api).await.unwrap());
    }

    #[tokio::test]
    async fn test_executions_query() {
        let (api, transport) = client(MockTransport::new().with_response(
            200,
            json!({"success": true, "executions": [
                {"execution_id": "e-1", "workflow_slug": "essay", "status": "completed"}
            ]}),
        ));

        assert!(cmd_executions(&api, Some("essay".to_string()), None, 10)
            .await
            .unwrap());

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/executions");
        assert_eq!(request.query.get("workflow_slug"), Some("essay".to_string()));
        assert_eq!(request.query.get("limit"), Some("10".to_string()));
    }

    #[tokio::test]
    async fn test_mcp_exec_sends_vars() {
        let (api, transport) =
            client(MockTransport::new().with_response(200, json!({"success": true, "result": 7})));

        let vars = vec!["a=3".to_string(), "b=4".to_string()];
        assert!(cmd_mcp_exec(&api, "calc.add".to_string(), None, &vars)
            .await
            .unwrap());

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/mcp-tools/execute");
        let body = request.body.clone().unwrap();
        assert_eq!(body["tool_id"], json!("calc.add"));
        assert_eq!(body["input"], json!({"a": 3, "b": 4}));
    }

    #[tokio::test]
    async fn test_status_propagates_not_found() {
        let (api, _) = client(
            MockTransport::new().with_response(404, json!({"error": {"message": "Execution not found"}})),
        );
        let err = cmd_status(&api, "missing").await.unwrap_err();
        assert!(err.to_string().contains("Execution not found"));
    }
}
