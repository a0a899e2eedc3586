//! Constraint checking against a compiled schema.
//!
//! The compiled schema is built into a `jsonschema` draft 7 validator with the
//! field formats registered. Every reported error is mapped back onto the
//! compiled schema and located by its instance pointer; checking never stops
//! at the first error.

use std::{fmt, sync::Arc};

use actionkit_types::{JsonSchema, SchemaType, SchemaTypes};
use actionkit_util::parse_date_like;
use jsonschema::{Draft, ValidationError, Validator, error::ValidationErrorKind};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::schema::{FORMAT_DATE_LIKE, FORMAT_PASSWORD, FORMAT_TEXT};

/// The constraint a [`FieldError`] violated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "keyword", rename_all = "camelCase")]
pub enum Violation {
    Type { expected: SchemaTypes, actual: &'static str },
    Required { property: String },
    AdditionalProperty { property: String, allowed: Vec<String> },
    Enum { allowed: Vec<Value> },
    Format { format: String },
    /// A keyword the compiler never emits, reported with the validator's message.
    Other { message: String },
}

impl Violation {
    fn rank(&self) -> u8 {
        match self {
            Self::Required { .. } => 0,
            Self::Type { .. } | Self::Enum { .. } | Self::Format { .. } | Self::Other { .. } => 1,
            Self::AdditionalProperty { .. } => 2,
        }
    }
}

/// One violated constraint, located by a JSON pointer (`""` is the root).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub pointer: String,
    #[serde(flatten)]
    pub violation: Violation,
}

impl FieldError {
    /// Name of the offending top-level field, when there is one.
    pub fn field(&self) -> Option<&str> {
        match &self.violation {
            Violation::Required { property } | Violation::AdditionalProperty { property, .. } if self.pointer.is_empty() => {
                Some(property.as_str())
            }
            _ => self.pointer.strip_prefix('/').map(|rest| rest.split('/').next().unwrap_or(rest)),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = if self.pointer.is_empty() {
            "The root value".to_string()
        } else {
            format!("The value at {}", self.pointer)
        };
        match &self.violation {
            Violation::Type { expected, actual } => {
                write!(f, "{subject} must be {} {expected} but it was {actual}.", article(expected))
            }
            Violation::Required { property } => write!(f, "{subject} is missing the required field '{property}'."),
            Violation::AdditionalProperty { property, allowed } => write!(
                f,
                "{subject} has an unexpected property, '{property}', which is not in the list of allowed properties ({}).",
                allowed.join(", ")
            ),
            Violation::Enum { allowed } => {
                let allowed: Vec<String> = allowed.iter().map(Value::to_string).collect();
                write!(f, "{subject} must be one of: {}.", allowed.join(", "))
            }
            Violation::Format { format } => write!(f, "{subject} must match format \"{format}\"."),
            Violation::Other { message } => write!(f, "{subject} is invalid: {message}."),
        }
    }
}

/// The compiled schema could not be built into a validator.
#[derive(Debug, Clone, Error)]
#[error("schema cannot be used for validation: {message}")]
pub struct SchemaError {
    message: String,
}

impl SchemaError {
    fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A compiled schema paired with its ready-to-run validator.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: JsonSchema,
    validator: Arc<Validator>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").field("schema", &self.schema).finish_non_exhaustive()
    }
}

impl SchemaValidator {
    pub fn new(schema: JsonSchema) -> Result<Self, SchemaError> {
        let mut document = serde_json::to_value(&schema).map_err(SchemaError::new)?;
        // The draft is pinned below; the dialect URI the compiler writes is informational.
        if let Some(root) = document.as_object_mut() {
            root.remove("$schema");
        }
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .should_validate_formats(true)
            .with_format(FORMAT_DATE_LIKE, |text: &str| parse_date_like(text).is_some())
            .with_format(FORMAT_TEXT, |_: &str| true)
            .with_format(FORMAT_PASSWORD, |_: &str| true)
            .build(&document)
            .map_err(SchemaError::new)?;
        Ok(Self {
            schema,
            validator: Arc::new(validator),
        })
    }

    pub fn schema(&self) -> &JsonSchema {
        &self.schema
    }

    /// Checks `value`, returning every violation ordered by location.
    pub fn check(&self, value: &Value) -> Vec<FieldError> {
        let mut errors: Vec<FieldError> = self
            .validator
            .iter_errors(value)
            .flat_map(|error| self.field_errors(value, &error))
            .collect();
        errors.sort_by(|left, right| {
            left.pointer
                .cmp(&right.pointer)
                .then_with(|| left.violation.rank().cmp(&right.violation.rank()))
        });
        errors
    }

    fn field_errors(&self, value: &Value, error: &ValidationError<'_>) -> Vec<FieldError> {
        let pointer = error.instance_path.to_string();
        let node = self.schema_at(&pointer);
        let at = |violation: Violation| FieldError {
            pointer: pointer.clone(),
            violation,
        };
        let other = || Violation::Other {
            message: error.to_string(),
        };

        match &error.kind {
            ValidationErrorKind::Type { .. } => {
                let violation = match node.and_then(|node| node.schema_type.clone()) {
                    Some(expected) => Violation::Type {
                        expected,
                        actual: describe(value.pointer(&pointer).unwrap_or(&Value::Null)),
                    },
                    None => other(),
                };
                vec![at(violation)]
            }
            ValidationErrorKind::Required { property } => vec![at(Violation::Required {
                property: property.as_str().map_or_else(|| property.to_string(), str::to_string),
            })],
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                let allowed: Vec<String> = node
                    .and_then(|node| node.properties.as_ref())
                    .map(|properties| properties.keys().cloned().collect())
                    .unwrap_or_default();
                unexpected
                    .iter()
                    .map(|property| {
                        at(Violation::AdditionalProperty {
                            property: property.clone(),
                            allowed: allowed.clone(),
                        })
                    })
                    .collect()
            }
            ValidationErrorKind::Enum { .. } => {
                let violation = match node.and_then(|node| node.enum_values.clone()) {
                    Some(allowed) => Violation::Enum { allowed },
                    None => other(),
                };
                vec![at(violation)]
            }
            ValidationErrorKind::Format { format } => vec![at(Violation::Format { format: format.clone() })],
            _ => vec![at(other())],
        }
    }

    /// Sub-schema that governs the instance at `pointer`.
    fn schema_at(&self, pointer: &str) -> Option<&JsonSchema> {
        pointer.split('/').skip(1).try_fold(&self.schema, |node, segment| {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            match (&node.properties, &node.items) {
                (Some(properties), _) if properties.contains_key(segment.as_str()) => properties.get(segment.as_str()),
                (_, Some(items)) => Some(items.as_ref()),
                _ => None,
            }
        })
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn article(types: &SchemaTypes) -> &'static str {
    match types.as_slice().first() {
        Some(SchemaType::Integer | SchemaType::Object | SchemaType::Array) => "an",
        _ => "a",
    }
}
