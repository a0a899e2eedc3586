use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

/// Bytes left as-is in a placeholder value: RFC 3986 unreserved characters.
const PATH_PLACEHOLDER: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Fills `{name}` placeholders in a path template with percent-encoded values.
///
/// String values are inserted without quotes; other JSON values use their JSON
/// text. Placeholders with no matching variable are left unchanged.
///
/// ```
/// use actionkit_util::http::build_path;
/// use serde_json::json;
///
/// let variables = json!({ "id": "a/b c", "field": 7 });
/// let path = build_path("/v1/persons/{id}/fields/{field}", variables.as_object().unwrap());
/// assert_eq!(path, "/v1/persons/a%2Fb%20c/fields/7");
/// ```
pub fn build_path(template: &str, variables: &Map<String, Value>) -> String {
    let mut path = template.to_string();
    for (name, value) in variables {
        let raw = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let encoded = utf8_percent_encode(&raw, PATH_PLACEHOLDER).to_string();
        path = path.replace(&format!("{{{name}}}"), &encoded);
    }
    path
}
