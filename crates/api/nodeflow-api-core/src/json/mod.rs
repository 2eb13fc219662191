use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::Value;

/// Policy describing how purely numeric arrays should be normalized when
/// converting shorthand JSON into the canonical `{ "type": ..., "data": ... }`
/// representation used by `nodeflow_api_core::Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericArrayPolicy {
    /// Arrays of length 2/3/4 become Vec2/Vec3/Vec4 respectively and any other
    /// numeric array becomes `Vector`.
    AutoVectorKinds,
    /// Treat all numeric arrays as `Vector` regardless of length.
    AlwaysVector,
}

/// Errors produced while reading value JSON.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("value json parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported value shorthand: {0}")]
    Unsupported(String),
}

/// Normalize shorthand `Value` JSON into the canonical `{ "type": ..., "data": ... }`
/// representation understood by the serde derives on [`Value`]. This helper accepts
/// both shorthand objects such as `{ "size": [1, 2] }` and primitive aliases
/// like `1.0`, `"text"` or `[0, 1]`.
pub fn normalize_value_json(value: JsonValue) -> JsonValue {
    normalize_value_json_with_policy(value, NumericArrayPolicy::AutoVectorKinds)
}

/// Shorthand keys that map one-to-one onto a tagged variant.
const TAGGED_SHORTHANDS: &[&str] = &[
    "float",
    "int",
    "bool",
    "vec2",
    "vec3",
    "vec4",
    "size",
    "thickness",
    "rect",
    "matrix",
    "vector",
    "text",
];

pub fn normalize_value_json_with_policy(value: JsonValue, policy: NumericArrayPolicy) -> JsonValue {
    match value {
        JsonValue::Number(n) => {
            if n.is_i64() || n.is_u64() {
                json!({ "type": "int", "data": n })
            } else {
                json!({ "type": "float", "data": n })
            }
        }
        JsonValue::Bool(b) => json!({ "type": "bool", "data": b }),
        JsonValue::String(s) => json!({ "type": "text", "data": s }),
        JsonValue::Array(arr) => {
            let all_numbers = arr.iter().all(|x| x.is_number());
            if all_numbers && !arr.is_empty() {
                match policy {
                    NumericArrayPolicy::AutoVectorKinds => match arr.len() {
                        2 => json!({ "type": "vec2", "data": arr }),
                        3 => json!({ "type": "vec3", "data": arr }),
                        4 => json!({ "type": "vec4", "data": arr }),
                        _ => json!({ "type": "vector", "data": arr }),
                    },
                    NumericArrayPolicy::AlwaysVector => {
                        json!({ "type": "vector", "data": arr })
                    }
                }
            } else {
                let data: Vec<JsonValue> = arr
                    .into_iter()
                    .map(|item| normalize_value_json_with_policy(item, policy))
                    .collect();
                json!({ "type": "list", "data": data })
            }
        }
        JsonValue::Object(obj) => {
            if obj.contains_key("type") && obj.contains_key("data") {
                return JsonValue::Object(obj);
            }
            for key in TAGGED_SHORTHANDS {
                if let Some(data) = obj.get(*key) {
                    return json!({ "type": key, "data": data });
                }
            }
            if let Some(arr) = obj.get("color") {
                return json!({ "type": "colorrgba", "data": arr });
            }
            if let Some(list_items) = obj.get("list").and_then(|x| x.as_array()) {
                let data: Vec<JsonValue> = list_items
                    .iter()
                    .cloned()
                    .map(|v| normalize_value_json_with_policy(v, policy))
                    .collect();
                return json!({ "type": "list", "data": data });
            }

            JsonValue::Object(obj)
        }
        other => other,
    }
}

/// Normalize value JSON then deserialize it into the strongly typed [`Value`] enum.
pub fn parse_value(value: JsonValue) -> Result<Value, JsonError> {
    if value.is_null() {
        return Err(JsonError::Unsupported("null".into()));
    }
    let normalized = normalize_value_json(value);
    Ok(serde_json::from_value(normalized)?)
}

/// Canonical JSON form of a value, as written into graph documents.
pub fn value_to_json(value: &Value) -> JsonValue {
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_numeric_arrays_auto_vectors() {
        let value = json!([1, 2, 3]);
        let normalized = normalize_value_json(value);
        assert_eq!(normalized["type"], "vec3");
    }

    #[test]
    fn normalize_numeric_arrays_always_vector() {
        let value = json!([1, 2, 3]);
        let normalized = normalize_value_json_with_policy(value, NumericArrayPolicy::AlwaysVector);
        assert_eq!(normalized["type"], "vector");
    }

    #[test]
    fn shorthand_objects_parse() {
        let parsed = parse_value(json!({ "size": [3.0, 4.0] })).expect("parse size");
        assert_eq!(parsed, Value::Size([3.0, 4.0]));

        let parsed = parse_value(json!(7)).expect("parse int");
        assert_eq!(parsed, Value::Int(7));

        let parsed = parse_value(json!(0.5)).expect("parse float");
        assert_eq!(parsed, Value::Float(0.5));
    }

    #[test]
    fn mixed_arrays_become_lists() {
        let parsed = parse_value(json!([1.0, "a"])).expect("parse list");
        assert_eq!(
            parsed,
            Value::List(vec![Value::Float(1.0), Value::Text("a".into())])
        );
    }

    #[test]
    fn canonical_form_roundtrips() {
        let value = Value::Thickness([1.0, 2.0, 3.0, 4.0]);
        let json = value_to_json(&value);
        assert_eq!(parse_value(json).expect("reparse"), value);
    }

    #[test]
    fn null_is_rejected() {
        assert!(matches!(
            parse_value(JsonValue::Null),
            Err(JsonError::Unsupported(_))
        ));
    }
}
