// Auggie JSON output parsing
//
// Auggie `--print --output-format json` emits a single JSON object rather
// than a line-delimited stream.

use serde_json::Value;

/// Transforms Auggie JSON output into readable text.
pub fn parse(output: &str) -> String {
    if output.trim().is_empty() {
        return output.to_string();
    }

    let trimmed = output.trim();
    if !trimmed.starts_with('{') {
        return output.to_string();
    }

    let event: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return output.to_string(),
    };

    if event.get("type").and_then(|t| t.as_str()) == Some("result") {
        if event.get("is_error").and_then(|e| e.as_bool()) == Some(true) {
            if let Some(err) = event.get("error").and_then(|e| e.as_str()) {
                if !err.is_empty() {
                    return err.to_string();
                }
            }
        }

        if let Some(result) = event.get("result").and_then(|r| r.as_str()) {
            return result.trim().to_string();
        }
    }

    output.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_result() {
        let input = "{\"type\":\"result\",\"result\":\"Created the helper module.\"}";
        assert_eq!(parse(input), "Created the helper module.");
    }

    #[test]
    fn test_result_is_trimmed() {
        let input = "{\"type\":\"result\",\"result\":\"  padded answer \\n\"}";
        assert_eq!(parse(input), "padded answer");
    }

    #[test]
    fn test_extracts_error_when_is_error() {
        let input = "{\"type\":\"result\",\"is_error\":true,\"error\":\"not authenticated\"}";
        assert_eq!(parse(input), "not authenticated");
    }

    #[test]
    fn test_non_result_object_returned_unchanged() {
        let input = "{\"type\":\"progress\",\"value\":3}";
        assert_eq!(parse(input), input);
    }

    #[test]
    fn test_plain_text_returned_unchanged() {
        let input = "Auggie 1.2.3";
        assert_eq!(parse(input), input);
    }

    #[test]
    fn test_malformed_json_returned_unchanged() {
        let input = "{\"type\":\"result\",";
        assert_eq!(parse(input), input);
    }
}
