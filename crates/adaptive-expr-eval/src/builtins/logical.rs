//! Comparison and boolean-logic builtins: equality, ordering, short-circuit
//! `and`/`or`, `if`, `exists`, and `coalesce`.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};

use crate::funcutil::{apply, validate_arity_and_any_type};
use crate::interpreter::{try_evaluate_node, EvalState};
use crate::options::Options;
use crate::registry::{insert, FunctionEntry};

/// The language-level `equals`/`==` semantics, distinct from
/// `Value`'s derived structural `PartialEq` used for Rust-level
/// comparisons: both-null is equal, either-null is not equal, two empty
/// lists/maps are equal, numerics compare within `1e-8`, otherwise
/// structural.
pub fn value_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(x), Value::Array(y)) if x.is_empty() && y.is_empty() => true,
        (Value::Object(x), Value::Object(y)) if x.is_empty() && y.is_empty() => true,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) if !matches!(a, Value::Boolean(_)) && !matches!(b, Value::Boolean(_)) => {
                (x - y).abs() < 1e-8
            }
            _ => a == b,
        },
    }
}

/// Numeric ordering used by `less`/`greater`/etc. Comparing null against a
/// number is always false, never an error.
fn numeric_cmp(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    let x = a.as_f64().filter(|_| !matches!(a, Value::Boolean(_)))?;
    let y = b.as_f64().filter(|_| !matches!(b, Value::Boolean(_)))?;
    x.partial_cmp(&y)
}

fn eval_and(
    node: &adaptive_expr_parse::AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    for child in &node.children {
        let (value, error) = try_evaluate_node(child, state, options);
        if error.is_some() || !value.is_logic_true() {
            return (Value::Boolean(false), None);
        }
    }
    (Value::Boolean(true), None)
}

fn eval_or(
    node: &adaptive_expr_parse::AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    for child in &node.children {
        let (value, error) = try_evaluate_node(child, state, options);
        if error.is_none() && value.is_logic_true() {
            return (Value::Boolean(true), None);
        }
    }
    (Value::Boolean(false), None)
}

fn eval_if(
    node: &adaptive_expr_parse::AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    let (cond, error) = try_evaluate_node(&node.children[0], state, options);
    if error.is_some() {
        return try_evaluate_node(&node.children[2], state, options);
    }
    if cond.is_logic_true() {
        try_evaluate_node(&node.children[1], state, options)
    } else {
        try_evaluate_node(&node.children[2], state, options)
    }
}

/// `coalesce`: returns the first non-null child value, discarding any
/// per-child error the way `and`/`or`/`if` do — a failing child is treated
/// as null, not propagated.
fn eval_coalesce(
    node: &adaptive_expr_parse::AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    for child in &node.children {
        let (value, error) = try_evaluate_node(child, state, options);
        if error.is_none() && !value.is_null() {
            return (value, None);
        }
    }
    (Value::Null, None)
}

fn eval_exists(
    node: &adaptive_expr_parse::AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    let (value, error) = try_evaluate_node(&node.children[0], state, options);
    if error.is_some() {
        return (Value::Boolean(false), None);
    }
    let value = options.substitute_null(&node.children[0].source_text, value);
    (Value::Boolean(!value.is_null()), None)
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "equals",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(value_equals(&args[0], &args[1]))), None),
    );
    insert(
        map,
        "notEquals",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(!value_equals(&args[0], &args[1]))), None),
    );
    insert(
        map,
        "not",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(|args| Ok(Value::Boolean(!args[0].is_logic_true())), None),
    );
    insert(
        map,
        "and",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::OBJECT)),
        Box::new(eval_and),
    );
    insert(
        map,
        "or",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::OBJECT)),
        Box::new(eval_or),
    );
    insert(
        map,
        "greater",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| Ok(Value::Boolean(numeric_cmp(&args[0], &args[1]) == Some(std::cmp::Ordering::Greater))),
            None,
        ),
    );
    insert(
        map,
        "greaterOrEquals",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                Ok(Value::Boolean(matches!(
                    numeric_cmp(&args[0], &args[1]),
                    Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
                )))
            },
            None,
        ),
    );
    insert(
        map,
        "less",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| Ok(Value::Boolean(numeric_cmp(&args[0], &args[1]) == Some(std::cmp::Ordering::Less))),
            None,
        ),
    );
    insert(
        map,
        "lessOrEquals",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| {
                Ok(Value::Boolean(matches!(
                    numeric_cmp(&args[0], &args[1]),
                    Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
                )))
            },
            None,
        ),
    );
    insert(
        map,
        "if",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 3, 3, ReturnType::OBJECT)),
        Box::new(eval_if),
    );
    insert(
        map,
        "exists",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        Box::new(eval_exists),
    );
    insert(
        map,
        "coalesce",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::OBJECT)),
        Box::new(eval_coalesce),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Expression;
    use crate::memory::SimpleObjectMemory;

    #[test]
    fn or_short_circuits_on_error() {
        let expr = Expression::parse("or(true, div(1, 0))").unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none());
        assert_eq!(v, Value::Boolean(true));
    }

    #[test]
    fn and_short_circuits_on_error() {
        let expr = Expression::parse("and(false, div(1, 0))").unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none());
        assert_eq!(v, Value::Boolean(false));
    }

    #[test]
    fn numeric_tolerance_equality() {
        assert!(value_equals(&Value::Number(1.0), &Value::Number(1.0 + 1e-9)));
    }

    #[test]
    fn null_vs_number_comparison_is_false_not_error() {
        assert_eq!(numeric_cmp(&Value::Null, &Value::Int(1)), None);
    }

    #[test]
    fn coalesce_discards_child_error_and_skips_null() {
        let expr = Expression::parse("coalesce(div(1, 0), 5)").unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none());
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn coalesce_returns_null_when_all_children_null_or_error() {
        let expr = Expression::parse("coalesce(div(1, 0), null)").unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none());
        assert_eq!(v, Value::Null);
    }
}
