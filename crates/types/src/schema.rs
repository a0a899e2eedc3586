//! Structural JSON schema model produced by the field compiler.
//!
//! Only the subset of JSON Schema the engine validates against is modelled:
//! type sets, object properties, required lists, closed objects, array items,
//! enumerations and a handful of format hints.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_DIALECT: &str = "http://json-schema.org/schema#";

/// JSON Schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
        }
    }

    /// Returns true when `value` is an instance of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.as_i64().is_some() || value.as_u64().is_some() || value.as_f64().is_some_and(|n| n.fract() == 0.0),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Null => value.is_null(),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `type` keyword: a single type or a list of accepted types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaTypes {
    Single(SchemaType),
    Many(Vec<SchemaType>),
}

impl SchemaTypes {
    pub fn as_slice(&self) -> &[SchemaType] {
        match self {
            Self::Single(single) => std::slice::from_ref(single),
            Self::Many(many) => many.as_slice(),
        }
    }

    pub fn contains(&self, schema_type: SchemaType) -> bool {
        self.as_slice().contains(&schema_type)
    }

    /// First accepted type that is not `null`.
    pub fn primary(&self) -> Option<SchemaType> {
        self.as_slice().iter().copied().find(|schema_type| *schema_type != SchemaType::Null)
    }

    /// Returns a copy widened with `extra` (no duplicates).
    pub fn with(&self, extra: SchemaType) -> Self {
        let mut types = self.as_slice().to_vec();
        if !types.contains(&extra) {
            types.push(extra);
        }
        Self::from(types)
    }

    pub fn accepts(&self, value: &Value) -> bool {
        self.as_slice().iter().any(|schema_type| schema_type.matches(value))
    }
}

impl From<SchemaType> for SchemaTypes {
    fn from(value: SchemaType) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<SchemaType>> for SchemaTypes {
    fn from(mut value: Vec<SchemaType>) -> Self {
        if value.len() == 1 {
            Self::Single(value.remove(0))
        } else {
            Self::Many(value)
        }
    }
}

impl fmt::Display for SchemaTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.as_slice().iter().map(SchemaType::as_str).collect();
        f.write_str(&names.join(" or "))
    }
}

/// A compiled schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchema {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, JsonSchema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<bool>,
}

impl JsonSchema {
    pub fn of_type(schema_type: impl Into<SchemaTypes>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Default::default()
        }
    }

    /// True when the node rejects properties it does not declare.
    pub fn is_closed(&self) -> bool {
        self.additional_properties == Some(false)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|required| required == name)
    }
}
