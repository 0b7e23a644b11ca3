//! Higher-order forms: `foreach`,
//! `select`, `where` bind an iterator name into a pushed memory frame and
//! evaluate a body once per element; `sortBy`/`sortByDescending`/
//! `indicesAndValues` are grouped here thematically but project over a
//! plain property-name string rather than a per-element lambda body.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use adaptive_expr_parse::AstNode;
use indexmap::IndexMap;

use crate::funcutil::{apply, validate_arity_and_any_type, validate_foreach};
use crate::interpreter::{try_evaluate_node, EvalState};
use crate::memory::SimpleObjectMemory;
use crate::options::Options;
use crate::registry::{insert, FunctionEntry};

/// Maps iterate as `{key, value}` pairs; strings are
/// not iterable here.
fn to_elements(v: &Value) -> Result<Vec<Value>, ExpressionError> {
    match v {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| {
                let mut pair = IndexMap::new();
                pair.insert("key".to_string(), Value::string(k.clone()));
                pair.insert("value".to_string(), v.clone());
                Value::Object(pair)
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(ExpressionError::type_error(
            "expected a list or object to iterate over",
        )),
    }
}

enum IterMode {
    Map,
    Filter,
}

/// Shared evaluator for `foreach`/`select`/`where`: push one frame per
/// element, run the body, always pop.
fn eval_iterate(
    node: &AstNode,
    state: &mut EvalState,
    options: &Options,
    mode: IterMode,
) -> (Value, Option<ExpressionError>) {
    let (collection, error) = try_evaluate_node(&node.children[0], state, options);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    let elements = match to_elements(&collection) {
        Ok(e) => e,
        Err(e) => return (Value::Null, Some(e)),
    };

    let (name, body): (&str, &AstNode) = if node.children.len() == 3 {
        (
            node.children[1]
                .as_simple_accessor_name()
                .expect("validate_foreach guarantees this shape"),
            &node.children[2],
        )
    } else {
        (
            node.children[1]
                .lambda_param
                .as_deref()
                .expect("validate_foreach guarantees this shape"),
            &node.children[1].children[0],
        )
    };

    let mut out = Vec::with_capacity(elements.len());
    for element in elements {
        let mut frame = SimpleObjectMemory::empty();
        frame.set_value(name, element.clone());
        state.push_frame(frame);
        let (value, error) = try_evaluate_node(body, state, options);
        state.pop_frame();
        if let Some(error) = error {
            return (Value::Null, Some(error));
        }
        match mode {
            IterMode::Map => out.push(value),
            IterMode::Filter => {
                if value.is_logic_true() {
                    out.push(element);
                }
            }
        }
    }
    (Value::Array(out), None)
}

fn cmp_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn sort_by(items: &[Value], property: Option<&str>, descending: bool) -> Vec<Value> {
    let mut pairs: Vec<(String, Value)> = items
        .iter()
        .map(|item| {
            let key = match property {
                Some(prop) => cmp_key(&crate::memory::access_property(item, prop)),
                None => cmp_key(item),
            };
            (key, item.clone())
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    if descending {
        pairs.reverse();
    }
    pairs.into_iter().map(|(_, v)| v).collect()
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "foreach",
        ReturnType::ARRAY,
        Some(validate_foreach),
        Box::new(|node, state, options| eval_iterate(node, state, options, IterMode::Map)),
    );
    insert(
        map,
        "select",
        ReturnType::ARRAY,
        Some(validate_foreach),
        Box::new(|node, state, options| eval_iterate(node, state, options, IterMode::Map)),
    );
    insert(
        map,
        "where",
        ReturnType::ARRAY,
        Some(validate_foreach),
        Box::new(|node, state, options| eval_iterate(node, state, options, IterMode::Filter)),
    );
    insert(
        map,
        "sortBy",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Array(items) = &args[0] else {
                    return Err(ExpressionError::type_error("sortBy: expected a list"));
                };
                let prop = match args.get(1) {
                    Some(Value::String(s)) => Some(s.as_str()),
                    _ => None,
                };
                Ok(Value::Array(sort_by(items, prop, false)))
            },
            None,
        ),
    );
    insert(
        map,
        "sortByDescending",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                let Value::Array(items) = &args[0] else {
                    return Err(ExpressionError::type_error("sortByDescending: expected a list"));
                };
                let prop = match args.get(1) {
                    Some(Value::String(s)) => Some(s.as_str()),
                    _ => None,
                };
                Ok(Value::Array(sort_by(items, prop, true)))
            },
            None,
        ),
    );
    insert(
        map,
        "indicesAndValues",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| match &args[0] {
                Value::Array(items) => Ok(Value::array(items.iter().enumerate().map(|(i, v)| {
                    let mut pair = IndexMap::new();
                    pair.insert("index".to_string(), Value::Int(i as i64));
                    pair.insert("value".to_string(), v.clone());
                    Value::Object(pair)
                }))),
                Value::Object(obj) => Ok(Value::array(obj.iter().map(|(k, v)| {
                    let mut pair = IndexMap::new();
                    pair.insert("index".to_string(), Value::string(k.clone()));
                    pair.insert("value".to_string(), v.clone());
                    Value::Object(pair)
                }))),
                _ => Err(ExpressionError::type_error(
                    "indicesAndValues: expected a list or object",
                )),
            },
            None,
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Expression;
    use crate::memory::SimpleObjectMemory;

    fn eval_with(src: &str, mem: &mut SimpleObjectMemory) -> (Value, Option<ExpressionError>) {
        let expr = Expression::parse(src).unwrap();
        expr.try_evaluate(mem, &Options::new())
    }

    #[test]
    fn foreach_with_bare_name_projects_and_counts() {
        let mut map = IndexMap::new();
        map.insert(
            "items".to_string(),
            Value::array([Value::string("zero"), Value::string("one"), Value::string("two")]),
        );
        let mut mem = SimpleObjectMemory::new(Value::Object(map));
        let (v, e) = eval_with("foreach(items, x, concat(x, string(count(items))))", &mut mem);
        assert!(e.is_none(), "{e:?}");
        assert_eq!(
            v,
            Value::array([Value::string("zero3"), Value::string("one3"), Value::string("two3")])
        );
    }

    #[test]
    fn foreach_with_lambda_sugar() {
        let mut map = IndexMap::new();
        map.insert("items".to_string(), Value::array([Value::Int(1), Value::Int(2)]));
        let mut mem = SimpleObjectMemory::new(Value::Object(map));
        let (v, e) = eval_with("foreach(items, x => add(x, 1))", &mut mem);
        assert!(e.is_none(), "{e:?}");
        assert_eq!(v, Value::array([Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn where_filters_by_truthiness() {
        let mut map = IndexMap::new();
        map.insert("items".to_string(), Value::array([Value::Int(1), Value::Int(2), Value::Int(3)]));
        let mut mem = SimpleObjectMemory::new(Value::Object(map));
        let (v, e) = eval_with("where(items, x, greater(x, 1))", &mut mem);
        assert!(e.is_none(), "{e:?}");
        assert_eq!(v, Value::array([Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn stack_is_balanced_after_error() {
        let mut map = IndexMap::new();
        map.insert("items".to_string(), Value::array([Value::Int(1), Value::Int(0)]));
        let mut mem = SimpleObjectMemory::new(Value::Object(map));
        let before = mem.root().clone();
        let (_, e) = eval_with("foreach(items, x, div(1, x))", &mut mem);
        assert!(e.is_some());
        assert_eq!(mem.root(), &before);
    }
}
