//! Terminal output helpers

use colored::Colorize;
use oo_core::{display_value, ErrorDetails, ExecutionResponse, OoError};
use serde_json::Value;

pub const RULE_WIDTH: usize = 60;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn banner(title: &str) {
    println!("{}", rule());
    println!("{}", title.bold());
    println!("{}", rule());
    println!(
        "Started at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!();
}

pub fn footer() {
    println!();
    println!("{}", rule());
    println!(
        "Completed at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("{}", rule());
}

pub fn status_icon(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Lines describing a finished execution
pub fn execution_lines(response: &ExecutionResponse, target: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(result) = &response.execution_result else {
        return lines;
    };

    lines.push(format!(
        "Execution ID: {}",
        result.execution_id.as_deref().unwrap_or("Unknown")
    ));
    if let Some(status) = &result.status {
        lines.push(format!("Status: {}", status));
    }
    lines.push(format!(
        "Name: {}",
        result
            .graph_name
            .as_deref()
            .or(response.workflow_name.as_deref())
            .unwrap_or(target)
    ));
    if let Some(time) = &result.execution_time {
        lines.push(format!("Execution Time: {}s", display_value(time)));
    }
    if let Some(message) = &response.message {
        lines.push(format!("Message: {}", message));
    }

    match &result.result {
        Some(Value::Object(map)) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            lines.push(format!("Result keys: {}", keys.join(", ")));
        }
        Some(Value::Null) | None => {}
        Some(other) => lines.push(format!("Result value: {}", truncate(&display_value(other), 200))),
    }

    lines
}

/// `key: value` lines for the execution summary, skipping a structured result
pub fn summary_lines(response: &ExecutionResponse) -> Vec<String> {
    let Ok(Value::Object(result)) = serde_json::to_value(&response.execution_result) else {
        return Vec::new();
    };

    result
        .iter()
        .filter(|(key, value)| {
            !value.is_null()
                && !(key.as_str() == "result" && (value.is_object() || value.is_array()))
        })
        .map(|(key, value)| format!("{}: {}", key, display_value(value)))
        .collect()
}

/// Lines for a server-side error report
pub fn error_detail_lines(details: &ErrorDetails) -> Vec<String> {
    let na = |field: &Option<String>| field.clone().unwrap_or_else(|| "N/A".to_string());

    let mut lines = vec![
        format!(
            "Exception Type: {}",
            details.exception_type.as_deref().unwrap_or("Unknown")
        ),
        format!("Exception Message: {}", na(&details.exception_message)),
    ];
    if let Some(graph) = &details.graph_name {
        lines.push(format!("Graph Name: {}", graph));
    }
    if let Some(workflow) = &details.workflow_name {
        lines.push(format!("Workflow Name: {}", workflow));
    }
    lines.push(format!("Error Category: {}", na(&details.error_category)));
    lines.push(format!("Timestamp: {}", na(&details.timestamp)));
    lines
}

/// Print a server-side error report, with its stack trace when present
pub fn print_error_details(details: &ErrorDetails) {
    eprintln!();
    eprintln!("{}", "🔍 Detailed Error Information:".yellow().bold());
    for line in error_detail_lines(details) {
        eprintln!("   {}", line);
    }

    let trace = details
        .full_stack_trace
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| (!details.traceback_lines.is_empty()).then(|| details.traceback_lines.concat()));
    if let Some(trace) = trace {
        eprintln!();
        eprintln!("{}", "📋 Stack Trace:".yellow());
        eprintln!("{}", rule());
        eprintln!("{}", trace.trim_end());
        eprintln!("{}", rule());
    }
}

/// Report a failed command: kind, message and any server diagnostics
pub fn print_failure(err: &anyhow::Error) {
    match err.downcast_ref::<OoError>() {
        Some(oo) => {
            eprintln!("{} {}: {}", "❌".red(), oo.kind().to_string().red().bold(), oo);
            let details = oo
                .details()
                .and_then(|d| d.get("error_details"))
                .and_then(|d| serde_json::from_value::<ErrorDetails>(d.clone()).ok());
            if let Some(details) = details {
                print_error_details(&details);
            }
        }
        None => eprintln!("{} {:#}", "❌ Error:".red().bold(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_execution_lines() {
        let response: ExecutionResponse = serde_json::from_value(json!({
            "success": true,
            "workflow_name": "sample_workflow",
            "message": "Workflow started",
            "execution_result": {
                "execution_id": "w-1",
                "status": "running",
                "result": {"essay": "...", "score": 9}
            }
        }))
        .unwrap();

        let lines = execution_lines(&response, "sample_workflow");
        assert_eq!(lines[0], "Execution ID: w-1");
        assert!(lines.contains(&"Status: running".to_string()));
        assert!(lines.contains(&"Name: sample_workflow".to_string()));
        assert!(lines.contains(&"Message: Workflow started".to_string()));
        assert!(lines.contains(&"Result keys: essay, score".to_string()));
    }

    #[test]
    fn test_summary_skips_structured_result() {
        let response: ExecutionResponse = serde_json::from_value(json!({
            "execution_result": {
                "execution_id": "g-1",
                "success": true,
                "result": {"nested": true}
            }
        }))
        .unwrap();

        let lines = summary_lines(&response);
        assert!(lines.contains(&"execution_id: g-1".to_string()));
        assert!(lines.contains(&"success: true".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("result")));
    }

    #[test]
    fn test_error_detail_lines() {
        let details: ErrorDetails = serde_json::from_value(json!({
            "exception_type": "KeyError",
            "exception_message": "'topic'",
            "workflow_name": "sample_workflow",
            "timestamp": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        let lines = error_detail_lines(&details);
        assert_eq!(lines[0], "Exception Type: KeyError");
        assert!(lines.contains(&"Workflow Name: sample_workflow".to_string()));
        assert!(lines.contains(&"Error Category: N/A".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Graph Name")));
    }
}
