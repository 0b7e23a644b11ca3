//! Object family, plus the `json` object-literal
//! constructor the parser's `{ ... }` syntax lowers to and the `concat`
//! template-string splice constructor's sibling, `createArray`'s object
//! counterpart.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use adaptive_expr_parse::AstNode;
use indexmap::IndexMap;

use crate::funcutil::{apply, evaluate_children, validate_arity_and_any_type};
use crate::interpreter::{try_evaluate_node, EvalState};
use crate::memory::{access_index, access_property, Memory};
use crate::options::Options;
use crate::registry::{insert, FunctionEntry};

/// `{a: 1, b: 2}` lowers to a `json` node with alternating key-literal/value
/// children; evaluate each value (keys are always literals, already
/// resolved by the parser) and fold them into an `Object` preserving
/// insertion order.
fn eval_json(node: &AstNode, state: &mut EvalState, options: &Options) -> (Value, Option<ExpressionError>) {
    let mut out = IndexMap::new();
    let mut i = 0;
    while i < node.children.len() {
        let key = match node.children[i].get_value() {
            Some(Value::String(s)) => s.clone(),
            _ => {
                return (
                    Value::Null,
                    Some(ExpressionError::validation("object literal: key must be a string literal")),
                )
            }
        };
        let (value, error) = try_evaluate_node(&node.children[i + 1], state, options);
        if let Some(error) = error {
            return (Value::Null, Some(error));
        }
        out.insert(key, value);
        i += 2;
    }
    (Value::Object(out), None)
}

/// `getProperty(obj, name)` reads a named property off an already-evaluated
/// value; `getProperty(path)` reads a dotted path directly from memory, the
/// way a bare `accessor` would.
fn eval_get_property(node: &AstNode, state: &mut EvalState, options: &Options) -> (Value, Option<ExpressionError>) {
    if node.children.len() == 1 {
        let (path, error) = try_evaluate_node(&node.children[0], state, options);
        if let Some(error) = error {
            return (Value::Null, Some(error));
        }
        let Value::String(path) = path else {
            return (
                Value::Null,
                Some(ExpressionError::type_error("getProperty: path must be a string")),
            );
        };
        return (state.memory.get_value(&path), None);
    }
    let (obj, error) = try_evaluate_node(&node.children[0], state, options);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    let (name, error) = try_evaluate_node(&node.children[1], state, options);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    let Value::String(name) = name else {
        return (
            Value::Null,
            Some(ExpressionError::type_error("getProperty: property name must be a string")),
        );
    };
    (access_property(&obj, &name), None)
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "json",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 0, usize::MAX, ReturnType::OBJECT)),
        Box::new(eval_json),
    );
    insert(
        map,
        "getProperty",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        Box::new(eval_get_property),
    );
    insert(
        map,
        "setProperty",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 3, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Object(obj) = &args[0] else {
                    return Err(ExpressionError::type_error("setProperty: expected an object"));
                };
                let Value::String(prop) = &args[1] else {
                    return Err(ExpressionError::type_error("setProperty: property name must be a string"));
                };
                let mut out = obj.clone();
                out.insert(prop.clone(), args[2].clone());
                Ok(Value::Object(out))
            },
            None,
        ),
    );
    insert(
        map,
        "addProperty",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 3, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Object(obj) = &args[0] else {
                    return Err(ExpressionError::type_error("addProperty: expected an object"));
                };
                let Value::String(prop) = &args[1] else {
                    return Err(ExpressionError::type_error("addProperty: property name must be a string"));
                };
                if obj.contains_key(prop) {
                    return Err(ExpressionError::domain(format!(
                        "addProperty: property '{prop}' already exists"
                    )));
                }
                let mut out = obj.clone();
                out.insert(prop.clone(), args[2].clone());
                Ok(Value::Object(out))
            },
            None,
        ),
    );
    insert(
        map,
        "removeProperty",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Object(obj) = &args[0] else {
                    return Err(ExpressionError::type_error("removeProperty: expected an object"));
                };
                let Value::String(prop) = &args[1] else {
                    return Err(ExpressionError::type_error("removeProperty: property name must be a string"));
                };
                let mut out = obj.clone();
                out.shift_remove(prop);
                Ok(Value::Object(out))
            },
            None,
        ),
    );
    insert(
        map,
        "merge",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::OBJECT)),
        apply(
            |args| {
                let mut out = IndexMap::new();
                for arg in args {
                    let Value::Object(obj) = arg else {
                        return Err(ExpressionError::type_error("merge: expected an object"));
                    };
                    for (k, v) in obj {
                        out.insert(k.clone(), v.clone());
                    }
                }
                Ok(Value::Object(out))
            },
            None,
        ),
    );
    insert(
        map,
        "jPath",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::STRING)),
        Box::new(eval_jpath),
    );
}

enum JPathSegment {
    Key(String),
    Index(i64),
}

/// Splits the scoped `jPath` subset (`a.b`, `a[0]`, `a.b[2].c`) into
/// segments. Deliberately independent of `memory::split_path` — that
/// parser is tuned for `setPathToValue` write targets (auto-vivifying
/// containers), while this is a read-only walk over an already-materialized
/// value.
fn split_jpath(path: &str) -> Vec<JPathSegment> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut current = String::new();
    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
                if !current.is_empty() {
                    segments.push(JPathSegment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                chars.next();
                if !current.is_empty() {
                    segments.push(JPathSegment::Key(std::mem::take(&mut current)));
                }
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                if let Ok(i) = inner.trim().parse::<i64>() {
                    segments.push(JPathSegment::Index(i));
                } else {
                    let trimmed = inner.trim().trim_matches(|c| c == '\'' || c == '"');
                    segments.push(JPathSegment::Key(trimmed.to_string()));
                }
            }
            _ => {
                current.push(c);
                chars.next();
            }
        }
    }
    if !current.is_empty() {
        segments.push(JPathSegment::Key(current));
    }
    segments
}

/// A deliberately scoped `jPath` ( Open Question resolution,
/// DESIGN.md): supports only the dotted/bracketed path subset
/// (`a.b`, `a[0]`, `a.b[2].c`), with an optional leading `$.`. No
/// predicates, wildcards, or recursive descent — full JSONPath is out of
/// scope for an engine with no independent path-query grammar.
fn eval_jpath(node: &AstNode, state: &mut EvalState, options: &Options) -> (Value, Option<ExpressionError>) {
    let (args, error) = evaluate_children(node, state, options, None);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    let Value::String(path) = &args[1] else {
        return (
            Value::Null,
            Some(ExpressionError::type_error("jPath: path must be a string")),
        );
    };
    let path = path.strip_prefix("$.").unwrap_or(path.strip_prefix('$').unwrap_or(path));
    let mut current = args[0].clone();
    for segment in split_jpath(path) {
        current = match segment {
            JPathSegment::Key(k) => access_property(&current, &k),
            JPathSegment::Index(i) => match access_index(&current, i) {
                Ok(v) => v,
                Err(e) => return (Value::Null, Some(e)),
            },
        };
    }
    (current, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Expression;
    use crate::memory::SimpleObjectMemory;

    fn eval(src: &str) -> Value {
        let expr = Expression::parse(src).unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none(), "unexpected error: {e:?}");
        v
    }

    #[test]
    fn object_literal_preserves_insertion_order() {
        let v = eval("{b: 2, a: 1}");
        let Value::Object(obj) = v else { panic!("expected object") };
        let keys: Vec<&str> = obj.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn add_property_errors_on_duplicate() {
        let expr = Expression::parse("addProperty({a: 1}, 'a', 2)").unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (_, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_some());
    }

    #[test]
    fn merge_is_left_to_right() {
        assert_eq!(eval("getProperty(merge({a: 1}, {a: 2, b: 3}), 'a')"), Value::Int(2));
    }

    #[test]
    fn jpath_walks_dotted_bracketed_segments() {
        assert_eq!(eval("jPath({a: {b: [10, 20]}}, '$.a.b[1]')"), Value::Int(20));
    }
}
