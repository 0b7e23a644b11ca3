//! Memory access primitives.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use adaptive_expr_parse::AstNode;

use crate::funcutil::validate_arity_and_any_type;
use crate::interpreter::{try_evaluate_node, EvalState};
use crate::memory::{access_index, access_property, Memory};
use crate::options::Options;
use crate::registry::{insert, FunctionEntry};

fn literal_name(node: &AstNode) -> Option<&str> {
    match node.get_value() {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn eval_accessor(
    node: &AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    let Some(name) = literal_name(&node.children[0]) else {
        return (
            Value::Null,
            Some(ExpressionError::validation("accessor: property name must be a string literal")),
        );
    };
    if node.children.len() == 1 {
        let value = state.memory.get_value(name);
        return (options.substitute_null(name, value), None);
    }
    let (parent, error) = try_evaluate_node(&node.children[1], state, options);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    (access_property(&parent, name), None)
}

fn eval_element(
    node: &AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    let (container, error) = try_evaluate_node(&node.children[0], state, options);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    let (index, error) = try_evaluate_node(&node.children[1], state, options);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    match &index {
        Value::Int(i) => match access_index(&container, *i) {
            Ok(v) => (v, None),
            Err(e) => (Value::Null, Some(e)),
        },
        Value::Number(n) if n.fract() == 0.0 => match access_index(&container, *n as i64) {
            Ok(v) => (v, None),
            Err(e) => (Value::Null, Some(e)),
        },
        Value::String(s) => (access_property(&container, s), None),
        _ => (
            Value::Null,
            Some(ExpressionError::type_error(
                "element: index must be an integer or a string",
            )),
        ),
    }
}

/// `tryAccumulatePath`: walks an accessor/element chain
/// assembling the dotted/bracketed path string `setPathToValue` writes to.
/// Index subscripts are evaluated at call time rather than required to
/// reduce statically — this engine has no separate static-constant-folding
/// pass, so a non-reducible subscript is simply evaluated immediately
/// instead of left as a residual subtree, a simplification noted in
/// DESIGN.md.
fn accumulate_path(
    node: &AstNode,
    state: &mut EvalState,
    options: &Options,
) -> Result<String, ExpressionError> {
    match node.expr_type.as_str() {
        "accessor" if node.children.len() == 1 => literal_name(&node.children[0])
            .map(|s| s.to_string())
            .ok_or_else(|| ExpressionError::validation("setPathToValue: invalid path expression")),
        "accessor" => {
            let name = literal_name(&node.children[0])
                .ok_or_else(|| ExpressionError::validation("setPathToValue: invalid path expression"))?;
            let parent_path = accumulate_path(&node.children[1], state, options)?;
            Ok(format!("{parent_path}.{name}"))
        }
        "element" => {
            let container_path = accumulate_path(&node.children[0], state, options)?;
            let (index, error) = try_evaluate_node(&node.children[1], state, options);
            if let Some(error) = error {
                return Err(error);
            }
            match index {
                Value::Int(i) => Ok(format!("{container_path}[{i}]")),
                Value::Number(n) if n.fract() == 0.0 => Ok(format!("{container_path}[{}]", n as i64)),
                Value::String(s) => Ok(format!("{container_path}['{s}']")),
                _ => Err(ExpressionError::type_error(
                    "setPathToValue: index must be an integer or a string",
                )),
            }
        }
        _ => Err(ExpressionError::validation(
            "setPathToValue: first argument must be a path expression",
        )),
    }
}

fn eval_set_path_to_value(
    node: &AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    let path = match accumulate_path(&node.children[0], state, options) {
        Ok(p) => p,
        Err(e) => return (Value::Null, Some(e)),
    };
    let (value, error) = try_evaluate_node(&node.children[1], state, options);
    if let Some(error) = error {
        return (Value::Null, Some(error));
    }
    state.memory.set_value(&path, value.clone());
    (value, None)
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "accessor",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::OBJECT)),
        Box::new(eval_accessor),
    );
    insert(
        map,
        "element",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        Box::new(eval_element),
    );
    insert(
        map,
        "setPathToValue",
        ReturnType::OBJECT,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        Box::new(eval_set_path_to_value),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Expression;
    use crate::memory::SimpleObjectMemory;

    #[test]
    fn set_path_to_value_round_trips() {
        let expr = Expression::parse("setPathToValue(path.simple, 3) + path.simple").unwrap();
        let mut map = indexmap::IndexMap::new();
        let mut path = indexmap::IndexMap::new();
        path.insert("array".to_string(), Value::array([Value::Int(1)]));
        map.insert("path".to_string(), Value::Object(path));
        let mut mem = SimpleObjectMemory::new(Value::Object(map));
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none(), "{e:?}");
        assert_eq!(v, Value::Int(6));
    }

    #[test]
    fn missing_path_reads_as_null() {
        let expr = Expression::parse("a.b.c").unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none());
        assert!(v.is_null());
    }
}
