//! Interpreting generator output
//!
//! Parse failures are reported as `MalformedGenerationOutput` so callers can
//! absorb them instead of aborting.

use crate::error::ApiError;
use crate::tree::QueryParam;
use serde_json::Value;

/// Remove markdown code fences the model may wrap its answer in
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Generated test script without a surrounding fence of any language tag
pub fn clean_script(text: &str) -> String {
    let trimmed = text.trim();
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag line, e.g. "```javascript"
    let body = fenced.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim().to_string()
}

/// Example body as a JSON value
pub fn parse_example_body(text: &str) -> Result<Value, ApiError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        ApiError::MalformedGenerationOutput(format!("example body is not JSON: {}", e))
    })
}

/// Query parameters from the first JSON array found in the text.
///
/// Entries without a usable key are dropped; non-string values are rendered
/// as their JSON text.
pub fn parse_query_params(text: &str) -> Result<Vec<QueryParam>, ApiError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(ApiError::MalformedGenerationOutput(
            "no JSON array in query parameter output".to_string(),
        ));
    };
    if end < start {
        return Err(ApiError::MalformedGenerationOutput(
            "no JSON array in query parameter output".to_string(),
        ));
    }

    let entries: Vec<Value> = serde_json::from_str(&text[start..=end]).map_err(|e| {
        ApiError::MalformedGenerationOutput(format!("query parameters are not a JSON array: {}", e))
    })?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let key = entry.get("key").and_then(Value::as_str)?;
            if key.trim().is_empty() {
                return None;
            }
            let value = match entry.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            Some(QueryParam::new(key, value))
        })
        .collect())
}
