//! Field definition compiler.
//!
//! [`compile`] turns a destination's field definitions into a closed
//! [`JsonSchema`] that the validation pass checks payloads against;
//! [`decompile`] recovers field definitions from a compiled schema for tooling.
//! Decompilation keeps the base type and the `required`, `allowNull` and
//! `multiple` flags; labels, descriptions and defaults are best effort.

use actionkit_types::{
    FieldChoice, FieldDefinition, FieldDefinitions, FieldType, JsonSchema, SCHEMA_DIALECT, SchemaType, SchemaTypes,
};
use indexmap::IndexMap;
use serde_json::Value;

pub const FORMAT_TEXT: &str = "text";
pub const FORMAT_PASSWORD: &str = "password";
pub const FORMAT_DATE_LIKE: &str = "date-like";

/// Compiles field definitions into a closed object schema.
pub fn compile(fields: &FieldDefinitions) -> JsonSchema {
    JsonSchema {
        dialect: Some(SCHEMA_DIALECT.to_string()),
        ..compile_object(fields)
    }
}

fn compile_object(fields: &FieldDefinitions) -> JsonSchema {
    let mut properties = IndexMap::with_capacity(fields.len());
    let mut required = Vec::new();
    for (name, field) in fields {
        properties.insert(name.clone(), compile_field(field));
        if field.required {
            required.push(name.clone());
        }
    }
    JsonSchema {
        properties: Some(properties),
        required,
        additional_properties: Some(false),
        ..JsonSchema::of_type(SchemaType::Object)
    }
}

fn compile_field(field: &FieldDefinition) -> JsonSchema {
    let base = base_types(field.field_type);
    let mut element = JsonSchema {
        format: format_for(field.field_type).map(str::to_string),
        enum_values: field.choices.as_ref().map(|choices| choice_values(choices, field.allow_null)),
        ..JsonSchema::of_type(if field.allow_null { base.with(SchemaType::Null) } else { base })
    };

    if field.field_type == FieldType::Object
        && let Some(nested) = &field.properties
    {
        let nested = compile_object(nested);
        element.properties = nested.properties;
        element.required = nested.required;
        element.additional_properties = nested.additional_properties;
    }

    let mut schema = if field.multiple {
        JsonSchema {
            items: Some(Box::new(element)),
            ..JsonSchema::of_type(SchemaType::Array)
        }
    } else {
        element
    };

    schema.title = Some(field.label.clone()).filter(|label| !label.is_empty());
    schema.description = Some(field.description.clone()).filter(|description| !description.is_empty());
    schema.default = field.default.clone();
    if field.dynamic {
        schema.dynamic = Some(true);
        schema.autocomplete = Some(true);
    }
    schema
}

fn base_types(field_type: FieldType) -> SchemaTypes {
    match field_type {
        FieldType::String | FieldType::Text | FieldType::Password => SchemaType::String.into(),
        FieldType::Datetime => vec![SchemaType::String, SchemaType::Number].into(),
        FieldType::Number => SchemaType::Number.into(),
        FieldType::Integer => SchemaType::Integer.into(),
        FieldType::Boolean => SchemaType::Boolean.into(),
        FieldType::Object => SchemaType::Object.into(),
    }
}

fn format_for(field_type: FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::Text => Some(FORMAT_TEXT),
        FieldType::Password => Some(FORMAT_PASSWORD),
        FieldType::Datetime => Some(FORMAT_DATE_LIKE),
        _ => None,
    }
}

fn choice_values(choices: &[FieldChoice], allow_null: bool) -> Vec<Value> {
    let mut values: Vec<Value> = choices.iter().map(|choice| choice.value.clone()).collect();
    if allow_null && !values.contains(&Value::Null) {
        values.push(Value::Null);
    }
    values
}

/// Recovers field definitions from an object schema's properties.
pub fn decompile(schema: &JsonSchema) -> FieldDefinitions {
    let Some(properties) = &schema.properties else {
        return FieldDefinitions::new();
    };
    properties
        .iter()
        .map(|(name, property)| (name.clone(), decompile_property(property, schema.is_required(name))))
        .collect()
}

fn decompile_property(property: &JsonSchema, required: bool) -> FieldDefinition {
    let multiple = property
        .schema_type
        .as_ref()
        .is_some_and(|types| types.contains(SchemaType::Array));
    let element = match (&property.items, multiple) {
        (Some(items), true) => items.as_ref(),
        _ => property,
    };
    let field_type = field_type_of(element);
    let allow_null = element
        .schema_type
        .as_ref()
        .is_some_and(|types| types.contains(SchemaType::Null));

    let mut field = FieldDefinition::new(property.title.clone().unwrap_or_default(), field_type);
    field.description = property.description.clone().unwrap_or_default();
    field.default = property.default.clone();
    field.required = required;
    field.allow_null = allow_null;
    field.multiple = multiple;
    field.dynamic = property.dynamic.unwrap_or(false);
    if field_type == FieldType::Object && element.properties.is_some() {
        field.properties = Some(decompile(element));
    }
    field.choices = element.enum_values.as_ref().map(|values| {
        values
            .iter()
            .filter(|value| !value.is_null())
            .map(|value| FieldChoice {
                label: match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                },
                value: value.clone(),
            })
            .collect()
    });
    field
}

fn field_type_of(schema: &JsonSchema) -> FieldType {
    match schema.format.as_deref() {
        Some(FORMAT_TEXT) => return FieldType::Text,
        Some(FORMAT_PASSWORD) => return FieldType::Password,
        Some(FORMAT_DATE_LIKE) => return FieldType::Datetime,
        _ => {}
    }
    let Some(types) = &schema.schema_type else {
        return FieldType::String;
    };
    if types.contains(SchemaType::String) && types.contains(SchemaType::Number) {
        return FieldType::Datetime;
    }
    match types.primary() {
        Some(SchemaType::Number) => FieldType::Number,
        Some(SchemaType::Integer) => FieldType::Integer,
        Some(SchemaType::Boolean) => FieldType::Boolean,
        Some(SchemaType::Object) => FieldType::Object,
        _ => FieldType::String,
    }
}
