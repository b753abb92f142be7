//! Structured-output extraction from generated text
//!
//! Models wrap JSON in code fences or surround it with prose. These helpers
//! recover the first JSON object, or a [`MalformedOutput`] the calling stage
//! turns into its fallback.

use serde_json::Value;

/// Generated text that does not satisfy the expected structure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedOutput {
    /// Response is empty after trimming
    #[error("empty response")]
    Empty,

    /// No parseable JSON object anywhere in the response
    #[error("no JSON object found: {0}")]
    NoJson(String),

    /// JSON parsed but a required field is missing or has the wrong shape
    #[error("field '{field}' is missing or invalid")]
    MissingField {
        /// Field name
        field: &'static str,
    },
}

/// Remove markdown code-fence lines
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// First JSON object in `text`
///
/// Tries the fence-stripped text as a whole, then the span between the
/// first `{` and the last `}`.
///
/// # Errors
/// `MalformedOutput::Empty` or `MalformedOutput::NoJson`.
pub fn extract_json_object(text: &str) -> Result<serde_json::Map<String, Value>, MalformedOutput> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(MalformedOutput::Empty);
    }

    let first_err = match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("top-level value is {}", kind(&other)),
        Err(e) => e.to_string(),
    };

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(map);
            }
        }
    }
    Err(MalformedOutput::NoJson(first_err))
}

/// Text form of a loosely typed label (strings as-is, numbers rendered)
#[must_use]
pub fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric value of a loosely typed score ("0.8" is accepted)
#[must_use]
pub fn score_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().map(|v| {
            if s.trim().ends_with('%') {
                v / 100.0
            } else {
                v
            }
        }),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
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

    #[test]
    fn fences_are_removed() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn object_inside_prose_is_found() {
        let text = "Here is the classification:\n{\"severity\": \"SEV2\"}\nHope that helps!";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["severity"], "SEV2");
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(matches!(
            extract_json_object("[1, 2, 3]"),
            Err(MalformedOutput::NoJson(_))
        ));
        assert_eq!(extract_json_object("   "), Err(MalformedOutput::Empty));
        assert!(extract_json_object("I cannot help with that").is_err());
    }

    #[test]
    fn scores_accept_strings_and_percentages() {
        assert_eq!(score_value(&serde_json::json!(0.4)), Some(0.4));
        assert_eq!(score_value(&serde_json::json!("0.7")), Some(0.7));
        assert_eq!(score_value(&serde_json::json!("85%")), Some(0.85));
        assert_eq!(score_value(&serde_json::json!(null)), None);
    }

    #[test]
    fn labels_accept_numbers() {
        assert_eq!(label_text(&serde_json::json!(" SEV1 ")), Some("SEV1".into()));
        assert_eq!(label_text(&serde_json::json!(2)), Some("2".into()));
        assert_eq!(label_text(&serde_json::json!([])), None);
    }
}
