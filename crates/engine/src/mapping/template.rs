use serde_json::Value;

use super::path::select_path;

/// Renders `{{path}}` references against `event`.
///
/// Missing paths render as empty strings. An unterminated `{{` is kept
/// verbatim together with the rest of the input.
pub fn render_template(template: &str, event: &Value) -> String {
    let mut output = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        let (before, after) = remaining.split_at(start);
        output.push_str(before);
        let Some(end) = after.find("}}") else {
            output.push_str(after);
            return output;
        };
        let expression = after[2..end].trim();
        if let Some(value) = select_path(event, expression) {
            output.push_str(&format_json_value(value));
        }
        remaining = &after[end + 2..];
    }

    output.push_str(remaining);
    output
}

fn format_json_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
