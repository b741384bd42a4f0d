// Codex JSONL output parsing
//
// Codex `exec --json` emits one event per line: `item` events wrap message
// content (text and thinking blocks) or function call output, and
// `aggregated_output` events carry combined command output.

use serde_json::Value;

/// Transforms Codex JSONL output into readable text.
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
        "item" => extract_from_item(&event),
        "aggregated_output" => event
            .get("output")
            .and_then(|o| o.as_str())
            .map(String::from),
        _ => None,
    }
}

/// Extracts content from an item event.
fn extract_from_item(event: &Value) -> Option<String> {
    let item = event.get("item")?;

    match item.get("type").and_then(|t| t.as_str())? {
        "message" => extract_from_message(item),
        "function_call_output" => item
            .get("output")
            .and_then(|o| o.as_str())
            .map(String::from),
        _ => None,
    }
}

/// Extracts text and thinking blocks from a message item.
fn extract_from_message(item: &Value) -> Option<String> {
    let content = item.get("content")?.as_array()?;

    let mut parts: Vec<&str> = Vec::new();
    for block in content {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
            }
            Some("thinking") => {
                if let Some(thinking) = block.get("thinking").and_then(|t| t.as_str()) {
                    if !thinking.is_empty() {
                        parts.push(thinking);
                    }
                }
            }
            _ => {}
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("\n"))
}
