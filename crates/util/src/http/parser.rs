//! Response body decoding.

use serde_json::Value;
use thiserror::Error;

/// Decodes a response body into a JSON value.
///
/// Empty bodies become `null`. A successful response with a JSON content type
/// is parsed strictly; any other body, including error pages mislabelled as
/// JSON, is parsed leniently and kept as a string when it is not JSON.
pub fn parse_response_body(text: &str, content_type: Option<&str>, status: u16) -> Result<Value, JsonParseError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    if (200..300).contains(&status) && content_type.is_some_and(is_json_content_type) {
        return parse_response_json_strict(text, Some(status));
    }
    Ok(serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Parses `text` as JSON. Failures carry the status and a one-line body excerpt.
pub fn parse_response_json_strict(text: &str, status: Option<u16>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|source| JsonParseError {
        status,
        excerpt: body_excerpt(text, BODY_EXCERPT_LIMIT),
        source,
    })
}

const BODY_EXCERPT_LIMIT: usize = 200;

/// Collapses whitespace runs to single spaces and cuts after `limit` bytes.
fn body_excerpt(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() <= limit {
        return collapsed;
    }
    let cut = (0..=limit).rev().find(|index| collapsed.is_char_boundary(*index)).unwrap_or(0);
    format!("{}...", &collapsed[..cut])
}

/// A body declared as JSON did not parse.
#[derive(Debug, Error)]
#[error("response{} is not valid JSON: {source} (body: {excerpt})", .status.map(|code| format!(" with status {code}")).unwrap_or_default())]
pub struct JsonParseError {
    status: Option<u16>,
    excerpt: String,
    #[source]
    source: serde_json::Error,
}

impl JsonParseError {
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body_excerpt(&self) -> &str {
        &self.excerpt
    }
}
