// Claude Code stream-json parsing
//
// Used by claude, cursor-agent and amp, which all emit the same
// line-delimited event stream: `assistant` events carry text content blocks,
// a final `result` event carries the aggregated answer (or an error).

use serde_json::Value;

/// Transforms stream-json output into readable text.
pub fn parse(output: &str) -> String {
    if output.trim().is_empty() {
        return output.to_string();
    }

    let mut result = String::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || !line.starts_with('{') {
            continue;
        }

        if let Some(extracted) = extract_from_line(line) {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&extracted);
        }
    }

    if result.is_empty() {
        return output.to_string();
    }
    result
}

/// Extracts readable content from a single JSON event line.
fn extract_from_line(line: &str) -> Option<String> {
    let event: Value = serde_json::from_str(line).ok()?;

    match event.get("type").and_then(|t| t.as_str())? {
        "assistant" => extract_from_assistant(&event),
        "result" => extract_from_result(&event),
        _ => None,
    }
}

/// Extracts the text content blocks from an assistant message event.
fn extract_from_assistant(event: &Value) -> Option<String> {
    let content = event.get("message")?.get("content")?.as_array()?;

    let parts: Vec<&str> = content
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .filter(|text| !text.is_empty())
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("\n"))
}

/// Extracts the final answer (or error message) from a result event.
fn extract_from_result(event: &Value) -> Option<String> {
    if event.get("is_error").and_then(|e| e.as_bool()) == Some(true) {
        if let Some(err) = event.get("error").and_then(|e| e.as_str()) {
            if !err.is_empty() {
                return Some(err.to_string());
            }
        }
    }

    event
        .get("result")
        .and_then(|r| r.as_str())
        .filter(|r| !r.is_empty())
        .map(String::from)
}
