//! Loose-to-strict type coercion applied before constraint checking.
//!
//! Values that already satisfy one of the accepted types are never touched.
//! Otherwise the accepted types are tried in declaration order and the first
//! successful conversion wins. `null` is never produced nor converted.

use actionkit_types::{JsonSchema, SchemaType};
use serde_json::{Number, Value};

/// Coerces `value` in place, recursing through object properties and array items.
pub fn coerce(schema: &JsonSchema, value: &mut Value) {
    if let Some(types) = &schema.schema_type
        && !types.accepts(value)
        && let Some(coerced) = types.as_slice().iter().find_map(|target| coerce_scalar(value, *target))
    {
        *value = coerced;
    }

    match value {
        Value::Object(map) => {
            if let Some(properties) = &schema.properties {
                for (name, property) in properties {
                    if let Some(nested) = map.get_mut(name) {
                        coerce(property, nested);
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = &schema.items {
                for item in items {
                    coerce(item_schema, item);
                }
            }
        }
        _ => {}
    }
}

/// Converts a scalar into `target`, or returns `None` when no loose reading exists.
pub fn coerce_scalar(value: &Value, target: SchemaType) -> Option<Value> {
    match (target, value) {
        (SchemaType::Number, Value::String(text)) => parse_number(text).map(Value::Number),
        (SchemaType::Integer, Value::String(text)) => parse_number(text).and_then(integral).map(Value::Number),
        (SchemaType::Integer, Value::Number(number)) => integral(number.clone()).map(Value::Number),
        (SchemaType::Number | SchemaType::Integer, Value::Bool(flag)) => Some(Value::from(u8::from(*flag))),
        (SchemaType::String, Value::Number(number)) => Some(Value::String(number.to_string())),
        (SchemaType::String, Value::Bool(flag)) => Some(Value::String(flag.to_string())),
        (SchemaType::Boolean, Value::String(text)) => match text.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(Number::from(integer));
    }
    trimmed.parse::<f64>().ok().and_then(Number::from_f64)
}

fn integral(number: Number) -> Option<Number> {
    if number.is_i64() || number.is_u64() {
        return Some(number);
    }
    number
        .as_f64()
        .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
        .map(|float| Number::from(float as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actionkit_types::SchemaTypes;
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn scalar_conversions() {
        assert_eq!(coerce_scalar(&json!("42"), SchemaType::Number), Some(json!(42)));
        assert_eq!(coerce_scalar(&json!(" 4.5 "), SchemaType::Number), Some(json!(4.5)));
        assert_eq!(coerce_scalar(&json!("4.5"), SchemaType::Integer), None);
        assert_eq!(coerce_scalar(&json!("7.0"), SchemaType::Integer), Some(json!(7)));
        assert_eq!(coerce_scalar(&json!(true), SchemaType::Number), Some(json!(1)));
        assert_eq!(coerce_scalar(&json!(12), SchemaType::String), Some(json!("12")));
        assert_eq!(coerce_scalar(&json!(false), SchemaType::String), Some(json!("false")));
        assert_eq!(coerce_scalar(&json!("true"), SchemaType::Boolean), Some(json!(true)));
        assert_eq!(coerce_scalar(&json!("yes"), SchemaType::Boolean), None);
        assert_eq!(coerce_scalar(&json!(""), SchemaType::Number), None);
    }

    #[test]
    fn null_is_never_coerced() {
        for target in [SchemaType::String, SchemaType::Number, SchemaType::Boolean, SchemaType::Integer] {
            assert_eq!(coerce_scalar(&Value::Null, target), None);
        }
    }

    #[test]
    fn coerces_nested_properties_and_items() {
        let mut properties = IndexMap::new();
        properties.insert("owner_id".to_string(), JsonSchema::of_type(SchemaType::Number));
        properties.insert(
            "tags".to_string(),
            JsonSchema {
                items: Some(Box::new(JsonSchema::of_type(SchemaType::String))),
                ..JsonSchema::of_type(SchemaType::Array)
            },
        );
        properties.insert("created".to_string(), JsonSchema::of_type(vec![SchemaType::String, SchemaType::Number]));
        let schema = JsonSchema {
            properties: Some(properties),
            ..JsonSchema::of_type(SchemaType::Object)
        };
        let mut value = json!({ "owner_id": "17", "tags": [1, true, "x"], "created": 1700000000, "extra": "5" });

        coerce(&schema, &mut value);

        assert_eq!(value, json!({ "owner_id": 17, "tags": ["1", "true", "x"], "created": 1700000000, "extra": "5" }));
    }

    #[test]
    fn leaves_accepted_values_alone() {
        let schema = JsonSchema::of_type(SchemaTypes::from(vec![SchemaType::String, SchemaType::Null]));
        let mut value = Value::Null;
        coerce(&schema, &mut value);
        assert_eq!(value, Value::Null);
    }
}
