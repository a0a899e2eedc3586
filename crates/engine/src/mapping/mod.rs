//! Declarative mapping kit.
//!
//! A mapping is a JSON document evaluated against an incoming event. Objects
//! with a single `@`-prefixed key are directives:
//!
//! - `{"@path": "$.traits.email"}` selects a value from the event
//! - `{"@template": "Hi {{traits.name}}"}` interpolates event values
//! - `{"@literal": <value>}` yields the value without evaluating it
//! - `{"@if": {"exists": <mapping>, "then": <mapping>, "else": <mapping>}}`
//!   branches on whether the condition resolves; `blank` in place of `exists`
//!   takes `then` when the condition is absent, `null` or an empty string
//!
//! Any other object or array is evaluated recursively; object keys whose value
//! resolves to nothing are dropped. Other scalars are literals.

mod path;
mod template;

use actionkit_types::FieldDefinitions;
use serde_json::{Map, Value};
use thiserror::Error;

pub use path::{is_valid_path, select_path};
pub use template::render_template;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("unknown mapping directive '{directive}' at {location}")]
    UnknownDirective { location: String, directive: String },

    #[error("invalid argument for '{directive}' at {location}: {message}")]
    InvalidArgument {
        location: String,
        directive: String,
        message: String,
    },

    #[error("directive objects must have exactly one key at {location}")]
    MixedDirective { location: String },
}

impl MappingError {
    fn invalid(location: &str, directive: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            location: location.to_string(),
            directive: directive.to_string(),
            message: message.into(),
        }
    }
}

/// Checks a mapping for unknown directives and malformed arguments.
pub fn validate_mapping(mapping: &Value) -> Result<(), MappingError> {
    validate_node(mapping, "$")
}

fn validate_node(node: &Value, location: &str) -> Result<(), MappingError> {
    match node {
        Value::Object(map) => {
            if let Some((directive, argument)) = directive_of(map, location)? {
                return validate_directive(directive, argument, location);
            }
            for (key, value) in map {
                validate_node(value, &format!("{location}.{key}"))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                validate_node(item, &format!("{location}[{index}]"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_directive(directive: &str, argument: &Value, location: &str) -> Result<(), MappingError> {
    match directive {
        "@path" => match argument.as_str() {
            Some(path) if is_valid_path(path) => Ok(()),
            Some(path) => Err(MappingError::invalid(location, directive, format!("malformed path '{path}'"))),
            None => Err(MappingError::invalid(location, directive, "expected a string path")),
        },
        "@template" if argument.is_string() => Ok(()),
        "@template" => Err(MappingError::invalid(location, directive, "expected a string template")),
        "@literal" => Ok(()),
        "@if" => {
            let Some(options) = argument.as_object() else {
                return Err(MappingError::invalid(location, directive, "expected an object"));
            };
            let condition = match (options.get("exists"), options.get("blank")) {
                (Some(condition), None) | (None, Some(condition)) => condition,
                _ => {
                    return Err(MappingError::invalid(
                        location,
                        directive,
                        "expected exactly one of 'exists' or 'blank'",
                    ));
                }
            };
            if let Some(unknown) = options
                .keys()
                .find(|key| !matches!(key.as_str(), "exists" | "blank" | "then" | "else"))
            {
                return Err(MappingError::invalid(location, directive, format!("unexpected option '{unknown}'")));
            }
            validate_node(condition, &format!("{location}.@if"))?;
            for branch in ["then", "else"] {
                if let Some(value) = options.get(branch) {
                    validate_node(value, &format!("{location}.@if.{branch}"))?;
                }
            }
            Ok(())
        }
        other => Err(MappingError::UnknownDirective {
            location: location.to_string(),
            directive: other.to_string(),
        }),
    }
}

/// Returns the directive of a directive object, `None` for plain objects.
fn directive_of<'a>(map: &'a Map<String, Value>, location: &str) -> Result<Option<(&'a str, &'a Value)>, MappingError> {
    let mut directives = map.iter().filter(|(key, _)| key.starts_with('@'));
    let Some((directive, argument)) = directives.next() else {
        return Ok(None);
    };
    if map.len() > 1 {
        return Err(MappingError::MixedDirective {
            location: location.to_string(),
        });
    }
    Ok(Some((directive.as_str(), argument)))
}

/// Evaluates `mapping` against `event`. A mapping that resolves to nothing
/// yields `null`.
pub fn transform(mapping: &Value, event: &Value) -> Result<Value, MappingError> {
    validate_mapping(mapping)?;
    Ok(resolve(mapping, event).unwrap_or(Value::Null))
}

/// Evaluates a validated mapping. `None` means the value is absent.
fn resolve(node: &Value, event: &Value) -> Option<Value> {
    match node {
        Value::Object(map) => {
            if let Some((directive, argument)) = map.iter().next().filter(|(key, _)| key.starts_with('@')) {
                return resolve_directive(directive, argument, event);
            }
            let resolved: Map<String, Value> = map
                .iter()
                .filter_map(|(key, value)| resolve(value, event).map(|resolved| (key.clone(), resolved)))
                .collect();
            Some(Value::Object(resolved))
        }
        Value::Array(items) => Some(Value::Array(
            items.iter().map(|item| resolve(item, event).unwrap_or(Value::Null)).collect(),
        )),
        other => Some(other.clone()),
    }
}

fn resolve_directive(directive: &str, argument: &Value, event: &Value) -> Option<Value> {
    match directive {
        "@path" => argument.as_str().and_then(|path| select_path(event, path)).cloned(),
        "@template" => argument.as_str().map(|template| Value::String(render_template(template, event))),
        "@literal" => Some(argument.clone()),
        "@if" => {
            let options = argument.as_object()?;
            let take_then = if let Some(condition) = options.get("exists") {
                resolve(condition, event).is_some()
            } else {
                let value = options.get("blank").and_then(|condition| resolve(condition, event));
                matches!(value, None | Some(Value::Null)) || value.as_ref().and_then(Value::as_str) == Some("")
            };
            let branch = if take_then { "then" } else { "else" };
            options.get(branch).and_then(|value| resolve(value, event))
        }
        _ => None,
    }
}

/// Builds a mapping from every field's `default`, for presets.
pub fn default_mapping(fields: &FieldDefinitions) -> Value {
    let mapping: Map<String, Value> = fields
        .iter()
        .filter_map(|(name, field)| field.default.clone().map(|default| (name.clone(), default)))
        .collect();
    Value::Object(mapping)
}
