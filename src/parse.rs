//! Model-response parsing and record validation.
//!
//! Models are asked for bare JSON but routinely wrap it in a code fence or
//! surround it with prose. [`extract_json_candidate`] picks the most likely
//! JSON text, [`parse_json_from_response`] parses it, and
//! [`validate_record`] coerces whatever came back into an
//! [`ActivityRecord`]. Validation never fails: unknown categories become
//! `unknown`, missing strings become empty, and the record's second is
//! always the frame's sampled second.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::record::{ActivityRecord, OverallAction};

/// Failure text recorded when no JSON object can be recovered.
pub const PARSE_FAILURE: &str = "Failed to parse JSON from response";

static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex")
});

static BRACED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Choose the text most likely to hold the JSON object.
///
/// In order: the object inside the first code fence (optionally tagged
/// `json`), else the span from the first `{` to the last `}`, else the whole
/// text.
///
/// # Example
///
/// ```
/// use secondsight::extract_json_candidate;
///
/// let text = "Sure!\n```json\n{\"a\": 1}\n```\nAnything else?";
/// assert_eq!(extract_json_candidate(text), "{\"a\": 1}");
/// assert_eq!(extract_json_candidate("see {\"b\": 2} here"), "{\"b\": 2}");
/// assert_eq!(extract_json_candidate("no json"), "no json");
/// ```
pub fn extract_json_candidate(text: &str) -> &str {
    if let Some(object) = FENCED_OBJECT.captures(text).and_then(|caps| caps.get(1)) {
        return object.as_str();
    }
    if let Some(span) = BRACED_SPAN.find(text) {
        return span.as_str();
    }
    text
}

/// Recover a non-empty JSON object from model text.
///
/// Returns `None` when the candidate is not valid JSON, is not an object, or
/// is an empty object.
pub fn parse_json_from_response(text: &str) -> Option<Map<String, Value>> {
    let candidate = extract_json_candidate(text);
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) if !map.is_empty() => Some(map),
        Ok(other) => {
            log::debug!("Response JSON is not a usable object: {other}");
            None
        }
        Err(error) => {
            log::debug!("Response is not valid JSON: {error}");
            None
        }
    }
}

/// Coerce a parsed object into a record for `second`.
///
/// Any `second` the model supplied is ignored.
pub fn validate_record(object: &Map<String, Value>, second: u64) -> ActivityRecord {
    let overall_action = match object.get("overall_action") {
        Some(Value::String(label)) => OverallAction::from_label(label),
        _ => OverallAction::Unknown,
    };

    let sub_action = object.get("sub_action").map(coerce_to_string).unwrap_or_default();

    let description = ["description", "short_description"]
        .iter()
        .filter_map(|key| object.get(*key))
        .map(coerce_to_string)
        .find(|text| !text.is_empty())
        .unwrap_or_default();

    ActivityRecord {
        second,
        overall_action,
        sub_action,
        description,
    }
}

/// Parse and validate in one step.
pub fn parse_activity(text: &str, second: u64) -> Option<ActivityRecord> {
    parse_json_from_response(text).map(|object| validate_record(&object, second))
}

/// String form of a JSON value; falsy values become empty.
fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) if number.as_f64() == Some(0.0) => String::new(),
        Value::Array(items) if items.is_empty() => String::new(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => other.to_string(),
    }
}
