//! Input assembly: JSON files, `key=value` pairs and typed conversion

use oo_core::{JsonMap, OoError, Result};
use serde_json::Value;
use std::path::Path;

/// Load an input object from a JSON file
pub fn load_input_file(path: &Path) -> Result<JsonMap> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OoError::InvalidInput(format!("Input file not found: {}", path.display()))
        } else {
            OoError::InvalidInput(format!("Error reading input file {}: {}", path.display(), e))
        }
    })?;

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(OoError::InvalidInput(format!(
            "Input file {} must contain a JSON object, found {}",
            path.display(),
            json_type(&other)
        ))),
        Err(e) => Err(OoError::InvalidInput(format!(
            "Invalid JSON in input file {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Parse `key=value` pairs; values are JSON when they parse, raw strings otherwise
pub fn parse_input_vars<I, S>(pairs: I) -> Result<JsonMap>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut vars = JsonMap::new();

    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, value)) = pair.split_once('=') else {
            return Err(OoError::InvalidInput(format!(
                "Invalid input variable format: {} (use key=value)",
                pair
            )));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(OoError::InvalidInput(format!(
                "Input variable has an empty key: {}",
                pair
            )));
        }

        let value = value.trim();
        let parsed = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        vars.insert(key.to_string(), parsed);
    }

    Ok(vars)
}

/// Convert typed-in text to a value of the declared field type
///
/// Returns `None` when the text is not a valid value of that type.
pub fn convert_input_value(raw: &str, field_type: &str) -> Option<Value> {
    match field_type {
        "integer" | "int" => raw.parse::<i64>().ok().map(Value::from),
        "number" | "float" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "boolean" | "bool" => Some(Value::Bool(matches!(
            raw.to_lowercase().as_str(),
            "true" | "1" | "yes" | "y" | "on"
        ))),
        "array" | "list" => Some(serde_json::from_str(raw).unwrap_or_else(|_| {
            Value::Array(
                raw.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            )
        })),
        "object" | "dict" => serde_json::from_str(raw).ok(),
        // "string" and anything unrecognized
        _ => Some(Value::String(raw.to_string())),
    }
}

/// Input state for a graph run with no input supplied
pub fn default_graph_input(graph_name: &str, sender: &str, prompt: &str) -> JsonMap {
    let mut input = JsonMap::new();
    input.insert("sender".to_string(), Value::String(sender.to_string()));
    input.insert("original_prompt".to_string(), Value::String(prompt.to_string()));

    // Routing hint for the graph's entry node
    let routing_key = format!("{}_next", graph_name.to_lowercase().replace(' ', "_"));
    input.insert(routing_key, Value::String(graph_name.to_string()));
    input
}

/// Sample values used when a workflow gets no input at all
pub fn sample_workflow_input() -> JsonMap {
    let mut input = JsonMap::new();
    input.insert("topic".to_string(), "artificial intelligence".into());
    input.insert("school_level".to_string(), "college".into());
    input.insert("subject".to_string(), "computer science".into());
    input
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_input_vars() {
        let vars = parse_input_vars([
            "topic=AI",
            "count = 3",
            "tags=[\"a\",\"b\"]",
            "expr=a=b",
            "flag=true",
        ])
        .unwrap();

        assert_eq!(vars["topic"], json!("AI"));
        assert_eq!(vars["count"], json!(3));
        assert_eq!(vars["tags"], json!(["a", "b"]));
        assert_eq!(vars["expr"], json!("a=b"));
        assert_eq!(vars["flag"], json!(true));
    }

    #[test]
    fn test_parse_input_vars_rejects_bad_pairs() {
        assert!(matches!(
            parse_input_vars(["no-equals"]),
            Err(OoError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_input_vars(["=value"]),
            Err(OoError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, r#"{"topic": "rust", "depth": 2}"#).unwrap();

        let input = load_input_file(&path).unwrap();
        assert_eq!(input["topic"], json!("rust"));
        assert_eq!(input["depth"], json!(2));
    }

    #[test]
    fn test_load_input_file_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = load_input_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(missing.to_string().contains("Input file not found"));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        assert!(load_input_file(&broken)
            .unwrap_err()
            .to_string()
            .contains("Invalid JSON"));

        let list = dir.path().join("list.json");
        std::fs::write(&list, "[1, 2]").unwrap();
        assert!(load_input_file(&list)
            .unwrap_err()
            .to_string()
            .contains("must contain a JSON object"));
    }

    #[test]
    fn test_convert_input_value() {
        assert_eq!(convert_input_value("hello", "string"), Some(json!("hello")));
        assert_eq!(convert_input_value("42", "integer"), Some(json!(42)));
        assert_eq!(convert_input_value("4.2", "int"), None);
        assert_eq!(convert_input_value("2.5", "number"), Some(json!(2.5)));
        assert_eq!(convert_input_value("abc", "float"), None);
        assert_eq!(convert_input_value("Yes", "boolean"), Some(json!(true)));
        assert_eq!(convert_input_value("on", "bool"), Some(json!(true)));
        assert_eq!(convert_input_value("nope", "bool"), Some(json!(false)));
        assert_eq!(convert_input_value("[1, 2]", "array"), Some(json!([1, 2])));
        assert_eq!(
            convert_input_value("a, b ,c", "list"),
            Some(json!(["a", "b", "c"]))
        );
        assert_eq!(
            convert_input_value(r#"{"k": 1}"#, "object"),
            Some(json!({"k": 1}))
        );
        assert_eq!(convert_input_value("k=1", "dict"), None);
        assert_eq!(convert_input_value("2024-01-01", "date"), Some(json!("2024-01-01")));
    }

    #[test]
    fn test_default_graph_input() {
        let input = default_graph_input("Deep Research", "oo-run", "Execution of Deep Research");
        assert_eq!(input["sender"], json!("oo-run"));
        assert_eq!(input["deep_research_next"], json!("Deep Research"));
        assert_eq!(input.len(), 3);
    }

    #[test]
    fn test_sample_workflow_input() {
        let input = sample_workflow_input();
        assert_eq!(input["topic"], json!("artificial intelligence"));
        assert_eq!(input.len(), 3);
    }
}
