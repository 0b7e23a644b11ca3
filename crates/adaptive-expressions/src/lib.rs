//! Facade crate for the adaptive expression language. Re-exports the
//! parse/eval crates behind the small surface callers actually embed
//! against, and adds a JSON memory bridge for the `adaptive-expr` CLI.
//!
//! ```
//! use adaptive_expressions::{parse, SimpleObjectMemory, Options, Value};
//! use indexmap::IndexMap;
//!
//! let expr = parse("add(one, two)").unwrap();
//! let mut scope = IndexMap::new();
//! scope.insert("one".to_string(), Value::Int(1));
//! scope.insert("two".to_string(), Value::Int(2));
//! let mut memory = SimpleObjectMemory::new(Value::Object(scope));
//! let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
//! assert!(error.is_none());
//! assert_eq!(value, Value::Int(3));
//! ```

pub use adaptive_expr_common::{ExpressionError, ExpressionErrorKind, ReturnType, Timex, Value};
pub use adaptive_expr_eval::{EvalState, Expression, Memory, Options, SimpleObjectMemory, StackedMemory};
pub use adaptive_expr_parse::AstNode;

pub mod json;

/// `parse(source) -> Expression`: parses and statically validates
/// `source`, returning an expression ready for repeated evaluation.
pub fn parse(source: &str) -> Result<Expression, ExpressionError> {
    Expression::parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn doc_example_add() {
        let expr = parse("add(one, two)").unwrap();
        let mut scope = IndexMap::new();
        scope.insert("one".to_string(), Value::Int(1));
        scope.insert("two".to_string(), Value::Int(2));
        let mut memory = SimpleObjectMemory::new(Value::Object(scope));
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn references_round_trip() {
        let expr = parse("concat(user.first, user.last)").unwrap();
        let refs = expr.references();
        assert!(refs.contains("user.first"));
        assert!(refs.contains("user.last"));
    }
}
