//! Evaluation engine for adaptive expressions: memory and stacked memory,
//! the function-utility combinators, the function registry, the builtin
//! catalog, and the higher-order binding forms. Pairs with
//! `adaptive-expr-parse`'s AST to produce `Expression`, the type most
//! callers hold.

pub mod builtins;
pub mod funcutil;
pub mod interpreter;
pub mod memory;
pub mod options;
pub mod registry;

pub use interpreter::{try_evaluate_node, EvalState, Expression};
pub use memory::{Memory, SimpleObjectMemory, StackedMemory};
pub use options::Options;

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_expr_common::Value;
    use indexmap::IndexMap;

    #[test]
    fn end_to_end_arithmetic() {
        let expr = Expression::parse("add(1, 2, 3)").unwrap();
        let mut memory = SimpleObjectMemory::empty();
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(value, Value::Int(6));
    }

    #[test]
    fn end_to_end_string_interpolation() {
        let expr = Expression::parse("`hello ${world}`").unwrap();
        let mut map = IndexMap::new();
        map.insert("world".to_string(), Value::string("world"));
        let mut memory = SimpleObjectMemory::new(Value::Object(map));
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(value, Value::string("hello world"));
    }

    #[test]
    fn end_to_end_foreach() {
        let expr =
            Expression::parse("foreach(items, x, concat(x, string(count(items))))").unwrap();
        let mut map = IndexMap::new();
        map.insert(
            "items".to_string(),
            Value::array([Value::string("zero"), Value::string("one"), Value::string("two")]),
        );
        let mut memory = SimpleObjectMemory::new(Value::Object(map));
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(
            value,
            Value::array([
                Value::string("zero3"),
                Value::string("one3"),
                Value::string("two3"),
            ])
        );
    }

    #[test]
    fn end_to_end_set_path_round_trip() {
        let expr = Expression::parse("setPathToValue(path.simple, 3) + path.simple").unwrap();
        let mut map = IndexMap::new();
        map.insert(
            "path".to_string(),
            Value::Object({
                let mut m = IndexMap::new();
                m.insert("array".to_string(), Value::array([Value::Int(1)]));
                m
            }),
        );
        let mut memory = SimpleObjectMemory::new(Value::Object(map));
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(value, Value::Int(6));
    }

    #[test]
    fn short_circuit_or_discards_error() {
        let expr = Expression::parse("or(true, div(1, 0))").unwrap();
        let mut memory = SimpleObjectMemory::empty();
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(value, Value::Boolean(true));
    }
}
