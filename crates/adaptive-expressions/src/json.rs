//! JSON bridge for the `adaptive-expr` CLI and any embedder that wants to
//! seed a [`SimpleObjectMemory`] from a JSON document. The engine's
//! [`Value`] has no canonical JSON mapping of its own, so this conversion
//! lives in the CLI-facing crate rather than the core evaluation engine.

use indexmap::IndexMap;
use serde_json::Value as Json;

use adaptive_expr_common::Value;

/// Converts a `serde_json::Value` into the engine's [`Value`]. Whole-valued
/// JSON numbers become [`Value::Int`]; everything else numeric becomes
/// [`Value::Number`], matching the engine's integer/float distinction.
pub fn value_from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(value_from_json).collect()),
        Json::Object(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k, value_from_json(v));
            }
            Value::Object(out)
        }
    }
}

/// Converts the engine's [`Value`] back into `serde_json::Value` for
/// printing evaluation results. Byte sequences, date-times and timexes
/// have no native JSON shape, so they render through their `Display` impl
/// as plain strings.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(_) | Value::DateTime(_) | Value::Timex(_) | Value::Error(_) => {
            Json::String(value.to_string())
        }
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), value_to_json(v));
            }
            Json::Object(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_nested_object() {
        let json: Json = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let value = value_from_json(json.clone());
        assert_eq!(value_to_json(&value), json);
    }

    #[test]
    fn whole_valued_json_number_becomes_int() {
        let value = value_from_json(serde_json::json!(3));
        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn fractional_json_number_becomes_number() {
        let value = value_from_json(serde_json::json!(3.5));
        assert_eq!(value, Value::Number(3.5));
    }
}
