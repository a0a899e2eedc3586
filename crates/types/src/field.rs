//! Declarative input field definitions.
//!
//! Destinations describe the inputs of an action (and the settings of a
//! destination) as an ordered map of field name to [`FieldDefinition`]. The
//! engine compiles these definitions into a closed JSON schema for validation.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered set of field definitions keyed by field name.
pub type FieldDefinitions = IndexMap<String, FieldDefinition>;

/// Declared type of an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Password,
    Number,
    Integer,
    Boolean,
    Datetime,
    Object,
}

impl FieldType {
    /// The lowercase name used in field definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Password => "password",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single selectable value for a field with a fixed set of choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChoice {
    pub label: String,
    pub value: Value,
}

/// Declarative description of one input field.
///
/// `default` holds either a literal or a mapping directive such as
/// `{"@path": "$.userId"}` that resolves the value from the incoming event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub allow_null: bool,
    #[serde(default)]
    pub multiple: bool,
    /// Nested shape for `object` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<FieldDefinitions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Marks the field as backed by an autocomplete resolver.
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<FieldChoice>>,
}

impl FieldDefinition {
    /// Creates an optional, single-valued, non-nullable field of the given type.
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            field_type,
            required: false,
            allow_null: false,
            multiple: false,
            properties: None,
            default: None,
            dynamic: false,
            choices: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn properties(mut self, properties: FieldDefinitions) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn choices(mut self, choices: Vec<FieldChoice>) -> Self {
        self.choices = Some(choices);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_camel_case_definition_with_defaults() {
        let field: FieldDefinition = serde_json::from_value(json!({
            "label": "Person ID",
            "type": "string",
            "allowNull": true,
            "default": { "@path": "$.userId" }
        }))
        .expect("deserialize field");

        assert_eq!(field.field_type, FieldType::String);
        assert!(field.allow_null);
        assert!(!field.required);
        assert!(!field.multiple);
        assert_eq!(field.default, Some(json!({ "@path": "$.userId" })));
    }

    #[test]
    fn parses_nested_yaml_fields() {
        let yaml = r#"
organization:
  label: Organization
  type: object
  properties:
    name:
      label: Name
      type: string
      required: true
    add_time:
      label: Added
      type: datetime
"#;
        let fields: FieldDefinitions = serde_yaml::from_str(yaml).expect("yaml fields");
        let nested = fields["organization"].properties.as_ref().expect("nested properties");
        assert_eq!(nested.keys().collect::<Vec<_>>(), vec!["name", "add_time"]);
        assert_eq!(nested["add_time"].field_type, FieldType::Datetime);
    }
}
