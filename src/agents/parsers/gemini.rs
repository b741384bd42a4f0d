// Gemini stream-json output parsing
//
// Gemini streams assistant messages as content deltas. Fragments must be
// concatenated without separators so they reassemble into continuous text.

use serde_json::Value;

/// Transforms Gemini stream-json output into readable text.
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
            result.push_str(&extracted);
        }
    }

    if result.is_empty() {
        return output.to_string();
    }
    result
}

/// Extracts assistant content from a single JSON event line.
fn extract_from_line(line: &str) -> Option<String> {
    let event: Value = serde_json::from_str(line).ok()?;

    if event.get("type").and_then(|t| t.as_str()) != Some("message") {
        return None;
    }
    if event.get("role").and_then(|r| r.as_str()) != Some("assistant") {
        return None;
    }

    event
        .get("content")
        .and_then(|c| c.as_str())
        .map(String::from)
}
