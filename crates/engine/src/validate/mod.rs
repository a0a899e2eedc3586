//! Input validation: a coercion pass followed by an independent `jsonschema`
//! check that aggregates every violation.

mod check;
mod coerce;

use std::fmt;

use serde::Serialize;
use serde_json::Value;

pub use check::{FieldError, SchemaError, SchemaValidator, Violation};
pub use coerce::{coerce, coerce_scalar};

/// Aggregate validation failure. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<FieldError>) -> Option<Self> {
        if errors.is_empty() { None } else { Some(Self { errors }) }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Top-level field names named by the violations, in order, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for field in self.errors.iter().filter_map(FieldError::field) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join(" "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Coerces `value` towards the validator's schema in place, then checks every
/// constraint.
pub fn validate(validator: &SchemaValidator, value: &mut Value) -> Result<(), ValidationErrors> {
    coerce(validator.schema(), value);
    match ValidationErrors::new(validator.check(value)) {
        Some(errors) => Err(errors),
        None => Ok(()),
    }
}
