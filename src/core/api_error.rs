//! Summarising error bodies returned by remote APIs.

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// One-line summary of an error body, when the body is JSON that carries one.
pub fn summarize_api_error(error_text: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(error_text.trim())
        .ok()
        .as_ref()
        .and_then(extract_error_summary)
        .filter(|summary| !summary.is_empty())
}

/// Render an error body for the terminal: summary line plus the pretty body.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {summary}\n{pretty_json}");
                }
            }
            return format!("API Error:\n{pretty_json}");
        }
    }

    format!("API Error: {trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_api_error_prettifies_json_with_summary() {
        let raw = r#"{"error":{"message":"model   overloaded","type":"server_error"}}"#;
        let expected = r#"API Error: model overloaded
{
  "error": {
    "message": "model   overloaded",
    "type": "server_error"
  }
}"#;
        assert_eq!(format_api_error(raw), expected);
    }

    #[test]
    fn format_api_error_handles_json_without_summary() {
        let expected = "API Error:\n{\n  \"status\": \"failed\"\n}";
        assert_eq!(format_api_error(r#"{"status":"failed"}"#), expected);
    }

    #[test]
    fn format_api_error_handles_plaintext_and_empty() {
        assert_eq!(format_api_error("  bad gateway "), "API Error: bad gateway");
        assert_eq!(format_api_error(""), "API Error: <empty>");
    }

    #[test]
    fn summary_prefers_nested_message_then_flat_fields() {
        assert_eq!(
            summarize_api_error(r#"{"error":"Story not found"}"#).as_deref(),
            Some("Story not found")
        );
        assert_eq!(
            summarize_api_error(r#"{"message":"Unauthorized"}"#).as_deref(),
            Some("Unauthorized")
        );
        assert_eq!(summarize_api_error("<html>"), None);
    }
}
