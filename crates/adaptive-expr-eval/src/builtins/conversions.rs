//! Type conversions & tests family.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::funcutil::{apply, validate_arity_and_any_type};
use crate::registry::{insert, FunctionEntry};

const DATA_URI_PREFIX: &str = "data:text/plain;charset=utf-8;base64,";

fn to_bytes(v: &Value) -> Vec<u8> {
    match v {
        Value::Bytes(b) => b.clone(),
        other => other.to_string().into_bytes(),
    }
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "int",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| match &args[0] {
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| ExpressionError::format(format!("int: cannot parse '{s}' as an integer"))),
                other => other
                    .as_f64()
                    .map(|n| Value::Int(n as i64))
                    .ok_or_else(|| ExpressionError::type_error("int: expected a number or numeric string")),
            },
            None,
        ),
    );
    insert(
        map,
        "float",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| match &args[0] {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| ExpressionError::format(format!("float: cannot parse '{s}' as a float"))),
                other => other
                    .as_f64()
                    .map(Value::Number)
                    .ok_or_else(|| ExpressionError::type_error("float: expected a number or numeric string")),
            },
            None,
        ),
    );
    insert(
        map,
        "string",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::String(args[0].to_string())), None),
    );
    insert(
        map,
        "bool",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        // `bool(0) = true`, `bool("hi") = true`: only `false` and `null`
        // are falsy, matching `is_logic_true` everywhere else in the engine.
        apply(|args| Ok(Value::Boolean(args[0].is_logic_true())), None),
    );
    insert(
        map,
        "binary",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Bytes(to_bytes(&args[0]))), None),
    );
    insert(
        map,
        "base64",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::String(BASE64.encode(to_bytes(&args[0])))), None),
    );
    insert(
        map,
        "base64ToBinary",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("base64ToBinary: expected a string"));
                };
                BASE64
                    .decode(s)
                    .map(Value::Bytes)
                    .map_err(|e| ExpressionError::format(format!("base64ToBinary: {e}")))
            },
            None,
        ),
    );
    insert(
        map,
        "base64ToString",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("base64ToString: expected a string"));
                };
                let bytes = BASE64
                    .decode(s)
                    .map_err(|e| ExpressionError::format(format!("base64ToString: {e}")))?;
                String::from_utf8(bytes)
                    .map(Value::String)
                    .map_err(|e| ExpressionError::format(format!("base64ToString: {e}")))
            },
            None,
        ),
    );
    insert(
        map,
        "dataUri",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        // `dataUri(s) = "data:text/plain;charset=utf-8;base64," + base64(utf8(s))`
        apply(
            |args| Ok(Value::String(format!("{DATA_URI_PREFIX}{}", BASE64.encode(to_bytes(&args[0]))))),
            None,
        ),
    );
    insert(
        map,
        "dataUriToBinary",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("dataUriToBinary: expected a string"));
                };
                let encoded = s
                    .splitn(2, ',')
                    .nth(1)
                    .ok_or_else(|| ExpressionError::format("dataUriToBinary: not a data URI"))?;
                BASE64
                    .decode(encoded)
                    .map(Value::Bytes)
                    .map_err(|e| ExpressionError::format(format!("dataUriToBinary: {e}")))
            },
            None,
        ),
    );
    insert(
        map,
        "dataUriToString",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("dataUriToString: expected a string"));
                };
                let encoded = s
                    .splitn(2, ',')
                    .nth(1)
                    .ok_or_else(|| ExpressionError::format("dataUriToString: not a data URI"))?;
                let bytes = BASE64
                    .decode(encoded)
                    .map_err(|e| ExpressionError::format(format!("dataUriToString: {e}")))?;
                String::from_utf8(bytes)
                    .map(Value::String)
                    .map_err(|e| ExpressionError::format(format!("dataUriToString: {e}")))
            },
            None,
        ),
    );
    insert(
        map,
        "uriComponent",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| Ok(Value::String(urlencoding::encode(&args[0].to_string()).into_owned())),
            None,
        ),
    );
    insert(
        map,
        "uriComponentToString",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("uriComponentToString: expected a string"));
                };
                urlencoding::decode(s)
                    .map(|s| Value::String(s.into_owned()))
                    .map_err(|e| ExpressionError::format(format!("uriComponentToString: {e}")))
            },
            None,
        ),
    );
    insert(
        map,
        "xml",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        // No full XML library is pulled in for a single escaping helper;
        // this covers the common "wrap a string value as XML text" case
        // named by 's "xml" collaborator family.
        apply(
            |args| {
                let s = args[0].to_string();
                let escaped = s
                    .replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;");
                Ok(Value::String(escaped))
            },
            None,
        ),
    );
    insert(
        map,
        "isBoolean",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(matches!(args[0], Value::Boolean(_)))), None),
    );
    insert(
        map,
        "isString",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(matches!(args[0], Value::String(_)))), None),
    );
    insert(
        map,
        "isInteger",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| Ok(Value::Boolean(!matches!(args[0], Value::Boolean(_)) && args[0].is_integer_valued())),
            None,
        ),
    );
    insert(
        map,
        "isFloat",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(matches!(args[0], Value::Number(_)))), None),
    );
    insert(
        map,
        "isArray",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(matches!(args[0], Value::Array(_)))), None),
    );
    insert(
        map,
        "isObject",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(matches!(args[0], Value::Object(_)))), None),
    );
    insert(
        map,
        "isDateTime",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(matches!(args[0], Value::DateTime(_)))), None),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Expression;
    use crate::memory::SimpleObjectMemory;
    use crate::options::Options;

    fn eval(src: &str) -> Value {
        let expr = Expression::parse(src).unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none(), "unexpected error: {e:?}");
        v
    }

    #[test]
    fn data_uri_matches_spec_scenario() {
        assert_eq!(
            eval("dataUri('hello')"),
            Value::string("data:text/plain;charset=utf-8;base64,aGVsbG8=")
        );
    }

    #[test]
    fn bool_of_zero_is_true() {
        assert_eq!(eval("bool(0)"), Value::Boolean(true));
        assert_eq!(eval("bool(\"\")"), Value::Boolean(true));
        assert_eq!(eval("bool(null)"), Value::Boolean(false));
    }

    #[test]
    fn is_integer_rejects_booleans() {
        assert_eq!(eval("isInteger(true)"), Value::Boolean(false));
        assert_eq!(eval("isInteger(3)"), Value::Boolean(true));
        assert_eq!(eval("isInteger(3.0)"), Value::Boolean(true));
    }
}
