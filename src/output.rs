//! JSON rendering of evaluation results.
//!
//! Integral floats are written as JSON integers so that `len($)` prints `3`
//! rather than `3.0`. Opaque values are rendered by walking the reflected
//! value they point at.
//!
//! # Examples
//!
//! ```
//! use tagexpr::Value;
//! use tagexpr::output::to_json;
//!
//! assert_eq!(to_json(&Value::Float(42.0)), serde_json::json!(42));
//! assert_eq!(to_json(&Value::Float(0.5)), serde_json::json!(0.5));
//! assert_eq!(to_json(&Value::Null), serde_json::Value::Null);
//! ```

use serde_json::{Map, Number};

use crate::reflect::{JsonValue, Reflect, View};
use crate::value::Value;

pub fn to_json(value: &Value<'_>) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Float(n) => float_to_json(*n),
        Value::String(s) => JsonValue::String(s.to_string()),
        Value::Opaque(field) => reflect_to_json(*field),
    }
}

fn float_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        JsonValue::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

/// Renders any reflected value.
pub fn reflect_to_json(value: &dyn Reflect) -> JsonValue {
    match value.view() {
        View::Nil | View::Pointer(None) => JsonValue::Null,
        View::Bool(b) => JsonValue::Bool(b),
        View::Int(n) => JsonValue::Number(Number::from(n)),
        View::Uint(n) => JsonValue::Number(Number::from(n)),
        View::Float(n) => Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number),
        View::Str(s) => JsonValue::String(s.to_string()),
        View::Pointer(Some(inner)) => reflect_to_json(inner),
        View::Seq(seq) => JsonValue::Array(
            (0..seq.len())
                .filter_map(|i| seq.get(i))
                .map(reflect_to_json)
                .collect(),
        ),
        View::Map(map) => JsonValue::Object(
            map.entries()
                .into_iter()
                .map(|entry| (entry.text, reflect_to_json(entry.value)))
                .collect(),
        ),
        View::Struct(s) => {
            let mut object = Map::new();
            for name in s.field_names() {
                if let Some(field) = s.field(name) {
                    object.insert(name.to_string(), reflect_to_json(field));
                }
            }
            JsonValue::Object(object)
        }
    }
}
