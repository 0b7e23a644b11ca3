//! Collection family, minus the higher-order
//! forms (`foreach`/`select`/`where`/`sortBy(Descending)`/
//! `indicesAndValues`), which live in `higher_order.rs` because they need
//! the stacked-memory push/pop discipline.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};

use crate::builtins::logical::value_equals;
use crate::funcutil::{apply, validate_arity_and_any_type};
use crate::registry::{insert, FunctionEntry};

fn require_container_len(v: &Value) -> Option<usize> {
    match v {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

/// `flatten(arr, depth=∞)` flattens lists only, never strings.
fn flatten(items: &[Value], depth: i64, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth != 0 => flatten(inner, depth.saturating_sub(1), out),
            other => out.push(other.clone()),
        }
    }
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "count",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| {
                require_container_len(&args[0])
                    .map(|n| Value::Int(n as i64))
                    .ok_or_else(|| ExpressionError::type_error("count: expected a string, list or object"))
            },
            None,
        ),
    );
    insert(
        map,
        "contains",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                Ok(Value::Boolean(match &args[0] {
                    Value::Array(items) => items.iter().any(|v| value_equals(v, &args[1])),
                    Value::Object(obj) => match &args[1] {
                        Value::String(k) => obj.contains_key(k),
                        _ => false,
                    },
                    Value::String(s) => match &args[1] {
                        Value::String(needle) => s.contains(needle.as_str()),
                        _ => false,
                    },
                    _ => false,
                }))
            },
            None,
        ),
    );
    insert(
        map,
        "empty",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| {
                Ok(Value::Boolean(match &args[0] {
                    Value::Null => true,
                    Value::String(s) => s.is_empty(),
                    Value::Array(items) => items.is_empty(),
                    Value::Object(obj) => obj.is_empty(),
                    _ => false,
                }))
            },
            None,
        ),
    );
    insert(
        map,
        "join",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 2, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Array(items) = &args[0] else {
                    return Err(ExpressionError::type_error("join: expected a list"));
                };
                let sep = args[1].to_string();
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                if args.len() > 2 && parts.len() > 1 {
                    let last_sep = args[2].to_string();
                    let (last, rest) = parts.split_last().unwrap();
                    Ok(Value::String(format!("{}{}{}", rest.join(&sep), last_sep, last)))
                } else {
                    Ok(Value::String(parts.join(&sep)))
                }
            },
            None,
        ),
    );
    insert(
        map,
        "first",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| match &args[0] {
                Value::Array(items) => Ok(items.first().cloned().unwrap_or(Value::Null)),
                Value::String(s) => Ok(s.chars().next().map(|c| Value::String(c.to_string())).unwrap_or(Value::Null)),
                _ => Ok(Value::Null),
            },
            None,
        ),
    );
    insert(
        map,
        "last",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| match &args[0] {
                Value::Array(items) => Ok(items.last().cloned().unwrap_or(Value::Null)),
                Value::String(s) => Ok(s.chars().last().map(|c| Value::String(c.to_string())).unwrap_or(Value::Null)),
                _ => Ok(Value::Null),
            },
            None,
        ),
    );
    insert(
        map,
        "union",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::ARRAY)),
        apply(
            |args| {
                let mut out: Vec<Value> = Vec::new();
                for arg in args {
                    let Value::Array(items) = arg else {
                        return Err(ExpressionError::type_error("union: expected a list"));
                    };
                    for item in items {
                        if !out.iter().any(|v| value_equals(v, item)) {
                            out.push(item.clone());
                        }
                    }
                }
                Ok(Value::Array(out))
            },
            None,
        ),
    );
    insert(
        map,
        "intersection",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::ARRAY)),
        apply(
            |args| {
                let mut lists = Vec::new();
                for arg in args {
                    let Value::Array(items) = arg else {
                        return Err(ExpressionError::type_error("intersection: expected a list"));
                    };
                    lists.push(items);
                }
                let Some((first, rest)) = lists.split_first() else {
                    return Ok(Value::array([]));
                };
                let mut out = Vec::new();
                for item in first.iter() {
                    if rest.iter().all(|list| list.iter().any(|v| value_equals(v, item)))
                        && !out.iter().any(|v: &Value| value_equals(v, item))
                    {
                        out.push((*item).clone());
                    }
                }
                Ok(Value::Array(out))
            },
            None,
        ),
    );
    insert(
        map,
        "skip",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Array(items) = &args[0] else {
                    return Err(ExpressionError::type_error("skip: expected a list"));
                };
                let n = args[1].as_f64().unwrap_or(0.0).max(0.0) as usize;
                Ok(Value::array(items.iter().skip(n).cloned()))
            },
            None,
        ),
    );
    insert(
        map,
        "take",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let n = args[1].as_f64().unwrap_or(0.0).max(0.0) as usize;
                match &args[0] {
                    Value::Array(items) => Ok(Value::array(items.iter().take(n).cloned())),
                    Value::String(s) => Ok(Value::String(s.chars().take(n).collect())),
                    _ => Err(ExpressionError::type_error("take: expected a list or string")),
                }
            },
            None,
        ),
    );
    insert(
        map,
        "subArray",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 2, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Array(items) = &args[0] else {
                    return Err(ExpressionError::type_error("subArray: expected a list"));
                };
                let start = args[1].as_f64().unwrap_or(0.0).max(0.0) as usize;
                let end = if args.len() > 2 {
                    (args[2].as_f64().unwrap_or(items.len() as f64) as usize).min(items.len())
                } else {
                    items.len()
                };
                if start > end {
                    return Err(ExpressionError::reference("subArray: start must not exceed end"));
                }
                Ok(Value::array(items[start..end].iter().cloned()))
            },
            None,
        ),
    );
    insert(
        map,
        "flatten",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Array(items) = &args[0] else {
                    return Err(ExpressionError::type_error("flatten: expected a list"));
                };
                let depth = if args.len() > 1 {
                    args[1].as_f64().unwrap_or(-1.0) as i64
                } else {
                    -1
                };
                let mut out = Vec::new();
                flatten(items, if depth < 0 { i64::MAX } else { depth }, &mut out);
                Ok(Value::Array(out))
            },
            None,
        ),
    );
    insert(
        map,
        "unique",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::ARRAY)),
        apply(
            |args| {
                let Value::Array(items) = &args[0] else {
                    return Err(ExpressionError::type_error("unique: expected a list"));
                };
                let mut out: Vec<Value> = Vec::new();
                for item in items {
                    if !out.iter().any(|v| value_equals(v, item)) {
                        out.push(item.clone());
                    }
                }
                Ok(Value::Array(out))
            },
            None,
        ),
    );
    insert(
        map,
        "createArray",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 0, usize::MAX, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Array(args.to_vec())), None),
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
    fn first_on_scalar_is_null_not_error() {
        assert_eq!(eval("first(5)"), Value::Null);
    }

    #[test]
    fn flatten_only_flattens_lists_not_strings() {
        assert_eq!(
            eval("flatten(createArray(createArray(1, 2), 'ab'))"),
            Value::array([Value::Int(1), Value::Int(2), Value::string("ab")])
        );
    }

    #[test]
    fn unique_preserves_first_occurrence_order() {
        assert_eq!(
            eval("unique(createArray(3, 1, 3, 2, 1))"),
            Value::array([Value::Int(3), Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn join_with_last_separator() {
        assert_eq!(
            eval("join(createArray('a', 'b', 'c'), ', ', ' and ')"),
            Value::string("a, b and c")
        );
    }
}
