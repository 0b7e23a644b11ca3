//! Function utilities: static validators, dynamic verifiers,
//! child evaluation, and the `apply*` combinators every "applied"-shape
//! builtin is built from.
//!
//! Grounded in `formualizer-eval/src/args.rs`'s `apply`/`apply_with_error`
//! closures, stripped of the Excel-only range/shape machinery (this engine
//! has no spreadsheet ranges, only scalars, arrays and objects). Where the
//! source models "any thrown exception" being caught and coerced to an
//! error string, idiomatic Rust has the inner function return `Result`
//! directly instead — there is no exception to catch.

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use adaptive_expr_parse::AstNode;

use crate::interpreter::{try_evaluate_node, EvalState};
use crate::options::Options;

pub type EvalResult = (Value, Option<ExpressionError>);

/// A raw evaluator receives the node, the mutable evaluation state, and the
/// options directly — needed for short-circuiting,
/// memory access, and higher-order forms.
pub type RawEvaluator = Box<dyn Fn(&AstNode, &mut EvalState, &Options) -> EvalResult + Send + Sync>;

/// Per-argument dynamic verifier, run after each child evaluates.
pub type Verify = fn(&Value, &AstNode, usize) -> Option<ExpressionError>;

pub type Validator = fn(&AstNode) -> Result<(), ExpressionError>;

// ---------------------------------------------------------------------
// Child evaluation
// ---------------------------------------------------------------------

/// `evaluateChildren`: evaluates children left to right,
/// short-circuiting on the first error; applies `verify` to each produced
/// value when given.
pub fn evaluate_children(
    node: &AstNode,
    state: &mut EvalState,
    options: &Options,
    verify: Option<Verify>,
) -> (Vec<Value>, Option<ExpressionError>) {
    let mut values = Vec::with_capacity(node.children.len());
    for (i, child) in node.children.iter().enumerate() {
        let (value, error) = try_evaluate_node(child, state, options);
        if let Some(error) = error {
            return (values, Some(error));
        }
        if let Some(verify) = verify {
            if let Some(error) = verify(&value, child, i) {
                return (values, Some(error));
            }
        }
        values.push(value);
    }
    (values, None)
}

// ---------------------------------------------------------------------
// Apply combinators
// ---------------------------------------------------------------------

/// `apply(fn, verify?)`: evaluate children, then call a pure function over
/// the resulting argument list.
pub fn apply(
    f: impl Fn(&[Value]) -> Result<Value, ExpressionError> + Send + Sync + 'static,
    verify: Option<Verify>,
) -> RawEvaluator {
    Box::new(move |node, state, options| {
        let (args, error) = evaluate_children(node, state, options, verify);
        if let Some(error) = error {
            return (Value::Null, Some(error));
        }
        match f(&args) {
            Ok(value) => (value, None),
            Err(error) => (Value::Null, Some(error)),
        }
    })
}

/// `applyWithError(fn, verify?)`: same as `apply`, but `fn` itself may
/// produce `(value, error)` directly rather than via `Result` — used by
/// builtins whose per-argument failure mode isn't representable by a
/// single up-front `verify` pass (e.g. `div` by zero is only knowable once
/// the divisor value is in hand).
pub fn apply_with_error(
    f: impl Fn(&[Value]) -> (Value, Option<ExpressionError>) + Send + Sync + 'static,
    verify: Option<Verify>,
) -> RawEvaluator {
    Box::new(move |node, state, options| {
        let (args, error) = evaluate_children(node, state, options, verify);
        if let Some(error) = error {
            return (Value::Null, Some(error));
        }
        f(&args)
    })
}

/// `applySequence(fn, verify?)`: left-fold `fn` over the evaluated
/// arguments, `((a op b) op c) op d`. Used by variadic arithmetic.
pub fn apply_sequence(
    f: impl Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    verify: Option<Verify>,
) -> RawEvaluator {
    Box::new(move |node, state, options| {
        let (args, error) = evaluate_children(node, state, options, verify);
        if let Some(error) = error {
            return (Value::Null, Some(error));
        }
        let mut iter = args.into_iter();
        let Some(first) = iter.next() else {
            return (Value::Null, None);
        };
        let acc = iter.fold(first, |acc, next| f(&acc, &next));
        (acc, None)
    })
}

/// `applySequenceWithError`: same fold, but aborts on the first error `fn`
/// produces.
pub fn apply_sequence_with_error(
    f: impl Fn(&Value, &Value) -> (Value, Option<ExpressionError>) + Send + Sync + 'static,
    verify: Option<Verify>,
) -> RawEvaluator {
    Box::new(move |node, state, options| {
        let (args, error) = evaluate_children(node, state, options, verify);
        if let Some(error) = error {
            return (Value::Null, Some(error));
        }
        let mut iter = args.into_iter();
        let Some(mut acc) = iter.next() else {
            return (Value::Null, None);
        };
        for next in iter {
            let (value, error) = f(&acc, &next);
            if let Some(error) = error {
                return (Value::Null, Some(error));
            }
            acc = value;
        }
        (acc, None)
    })
}

// ---------------------------------------------------------------------
// Static validators (run once, when a call node is bound to its registry
// entry)
// ---------------------------------------------------------------------

fn node_label(node: &AstNode) -> &str {
    if node.source_text.is_empty() {
        node.expr_type.as_str()
    } else {
        node.source_text.as_str()
    }
}

pub fn validate_arity_and_any_type(
    node: &AstNode,
    min_arity: usize,
    max_arity: usize,
    declared: ReturnType,
) -> Result<(), ExpressionError> {
    let n = node.children.len();
    if n < min_arity || n > max_arity {
        return Err(ExpressionError::validation(format!(
            "{} expects between {} and {} arguments, got {}",
            node_label(node),
            min_arity,
            max_arity,
            n
        )));
    }
    if !declared.contains(ReturnType::OBJECT) {
        for child in &node.children {
            let actual = child.return_type();
            if !ReturnType::accepts(declared, actual) {
                return Err(ExpressionError::validation(format!(
                    "{}: argument '{}' has an incompatible type",
                    node_label(node),
                    node_label(child)
                )));
            }
        }
    }
    Ok(())
}

pub fn validate_unary(node: &AstNode, declared: ReturnType) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(node, 1, 1, declared)
}

pub fn validate_binary(node: &AstNode, declared: ReturnType) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(node, 2, 2, declared)
}

pub fn validate_binary_number(node: &AstNode) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(node, 2, 2, ReturnType::NUMBER)
}

pub fn validate_unary_string(node: &AstNode) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)
}

pub fn validate_at_least_one(node: &AstNode) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::OBJECT)
}

pub fn validate_two_or_more_numbers(node: &AstNode) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(node, 2, usize::MAX, ReturnType::NUMBER)
}

pub fn validate_unary_or_binary_number(node: &AstNode) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(node, 1, 2, ReturnType::NUMBER)
}

/// `validateOrder(node, optionalTypes, requiredTypes...)`: enforces a
/// positional signature where `required` must all be present and
/// `optional` may trail after them.
pub fn validate_order(
    node: &AstNode,
    optional_types: &[ReturnType],
    required_types: &[ReturnType],
) -> Result<(), ExpressionError> {
    let min = required_types.len();
    let max = required_types.len() + optional_types.len();
    let n = node.children.len();
    if n < min || n > max {
        return Err(ExpressionError::validation(format!(
            "{} expects between {} and {} arguments, got {}",
            node_label(node),
            min,
            max,
            n
        )));
    }
    for (i, child) in node.children.iter().enumerate() {
        let declared = if i < required_types.len() {
            required_types[i]
        } else {
            optional_types[i - required_types.len()]
        };
        if !declared.contains(ReturnType::OBJECT) && !ReturnType::accepts(declared, child.return_type())
        {
            return Err(ExpressionError::validation(format!(
                "{}: argument {} ('{}') has an incompatible type",
                node_label(node),
                i,
                node_label(child)
            )));
        }
    }
    Ok(())
}

/// `validateForeach`: the iterator-name position (child 1 in the 3-child
/// form, or the lambda itself in the 2-child sugar form) must name exactly
/// one bound identifier.
pub fn validate_foreach(node: &AstNode) -> Result<(), ExpressionError> {
    match node.children.len() {
        2 => {
            if node.children[1].expr_type != "lambda" || node.children[1].lambda_param.is_none() {
                return Err(ExpressionError::validation(format!(
                    "{}: second argument must be a lambda `(name) => body`",
                    node_label(node)
                )));
            }
            Ok(())
        }
        3 => {
            if node.children[1].as_simple_accessor_name().is_none() {
                return Err(ExpressionError::validation(format!(
                    "{}: second argument must be a bare iterator name",
                    node_label(node)
                )));
            }
            Ok(())
        }
        n => Err(ExpressionError::validation(format!(
            "{} expects 2 or 3 arguments, got {}",
            node_label(node),
            n
        ))),
    }
}

// ---------------------------------------------------------------------
// Dynamic verifiers
// ---------------------------------------------------------------------

pub fn verify_string(v: &Value, node: &AstNode, _i: usize) -> Option<ExpressionError> {
    match v {
        Value::String(_) => None,
        _ => Some(ExpressionError::type_error(format!(
            "{}: expected a string",
            node_label(node)
        ))),
    }
}

pub fn verify_string_or_null(v: &Value, node: &AstNode, i: usize) -> Option<ExpressionError> {
    if v.is_null() {
        None
    } else {
        verify_string(v, node, i)
    }
}

/// Booleans are not numbers for verification purposes.
pub fn verify_number(v: &Value, node: &AstNode, _i: usize) -> Option<ExpressionError> {
    match v {
        Value::Int(_) | Value::Number(_) => None,
        _ => Some(ExpressionError::type_error(format!(
            "{}: expected a number",
            node_label(node)
        ))),
    }
}

pub fn verify_integer(v: &Value, node: &AstNode, _i: usize) -> Option<ExpressionError> {
    if v.is_integer_valued() && !matches!(v, Value::Boolean(_)) {
        None
    } else {
        Some(ExpressionError::type_error(format!(
            "{}: expected an integer",
            node_label(node)
        )))
    }
}

pub fn verify_list(v: &Value, node: &AstNode, _i: usize) -> Option<ExpressionError> {
    match v {
        Value::Array(_) => None,
        _ => Some(ExpressionError::type_error(format!(
            "{}: expected a list",
            node_label(node)
        ))),
    }
}

pub fn verify_numeric_list(v: &Value, node: &AstNode, i: usize) -> Option<ExpressionError> {
    match v {
        Value::Array(items) => {
            for item in items {
                if let Some(e) = verify_number(item, node, i) {
                    return Some(e);
                }
            }
            None
        }
        _ => Some(ExpressionError::type_error(format!(
            "{}: expected a list of numbers",
            node_label(node)
        ))),
    }
}

pub fn verify_numeric_list_or_number(v: &Value, node: &AstNode, i: usize) -> Option<ExpressionError> {
    match v {
        Value::Int(_) | Value::Number(_) => None,
        Value::Array(_) => verify_numeric_list(v, node, i),
        _ => Some(ExpressionError::type_error(format!(
            "{}: expected a number or a list of numbers",
            node_label(node)
        ))),
    }
}

pub fn verify_not_null(v: &Value, node: &AstNode, _i: usize) -> Option<ExpressionError> {
    if v.is_null() {
        Some(ExpressionError::type_error(format!(
            "{}: argument must not be null",
            node_label(node)
        )))
    } else {
        None
    }
}

pub fn verify_container(v: &Value, node: &AstNode, _i: usize) -> Option<ExpressionError> {
    match v {
        Value::Array(_) | Value::Object(_) | Value::String(_) => None,
        _ => Some(ExpressionError::type_error(format!(
            "{}: expected a string, list or object",
            node_label(node)
        ))),
    }
}

pub fn verify_number_or_string(v: &Value, node: &AstNode, _i: usize) -> Option<ExpressionError> {
    match v {
        Value::Int(_) | Value::Number(_) | Value::String(_) => None,
        _ => Some(ExpressionError::type_error(format!(
            "{}: expected a number or a string",
            node_label(node)
        ))),
    }
}
