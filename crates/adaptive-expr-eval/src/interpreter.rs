//! AST node evaluation and the public `Expression` facade type. Dispatch
//! here is purely by function identifier through the registry — there is
//! no reference/range resolution, only literal, accessor, element, call,
//! and lambda node kinds.

use std::collections::HashSet;
use std::sync::Arc;

use adaptive_expr_common::{ExpressionError, Value};
use adaptive_expr_parse::AstNode;

use crate::memory::{Memory, SimpleObjectMemory, StackedMemory};
use crate::options::Options;
use crate::registry;

/// Per-evaluation mutable state: the stacked memory higher-order forms
/// push/pop frames onto. Created fresh for each top-level `try_evaluate`
/// call and never retained afterward.
pub struct EvalState<'a> {
    pub memory: StackedMemory<'a>,
}

impl<'a> EvalState<'a> {
    pub fn new(base: &'a mut dyn Memory) -> Self {
        Self {
            memory: StackedMemory::wrap(base),
        }
    }

    pub fn push_frame(&mut self, frame: SimpleObjectMemory) {
        self.memory.push(frame);
    }

    pub fn pop_frame(&mut self) {
        self.memory.pop();
    }
}

/// `tryEvaluate` dispatch: looks up the node's bound evaluator
/// by function identifier and delegates. Literal nodes short-circuit
/// without a registry lookup.
pub fn try_evaluate_node(
    node: &AstNode,
    state: &mut EvalState,
    options: &Options,
) -> (Value, Option<ExpressionError>) {
    if let Some(value) = node.get_value() {
        return (value.clone(), None);
    }
    if node.expr_type == "lambda" {
        // Reached only if a lambda appears outside a higher-order form's
        // iterator-name position; evaluate the body directly as a
        // reasonable fallback rather than erroring.
        return try_evaluate_node(&node.children[0], state, options);
    }
    match registry::get(&node.expr_type) {
        Some(entry) => (entry.evaluator)(node, state, options),
        None => (
            Value::Null,
            Some(ExpressionError::validation(format!(
                "unknown function '{}'",
                node.expr_type
            ))),
        ),
    }
}

/// Static validation pass: walks the tree once, raising
/// at the first arity/type mismatch, and binds each call node's declared
/// return type from its registry entry. Run once when an `Expression` is
/// constructed — while this function still owns the tree exclusively, before
/// it is wrapped in the `Arc` every evaluation thread shares — not on every
/// evaluation.
pub fn validate_tree(node: &mut AstNode) -> Result<(), ExpressionError> {
    if node.is_literal() {
        return Ok(());
    }
    if node.expr_type == "lambda" {
        return validate_tree(&mut node.children[0]);
    }
    // Post-order: children must have their declared return type bound
    // before this node's validator inspects them (e.g.
    // `validate_arity_and_any_type` reads `child.return_type()`).
    for child in &mut node.children {
        validate_tree(child)?;
    }
    let entry = registry::get(&node.expr_type).ok_or_else(|| {
        ExpressionError::validation(format!("unknown function '{}'", node.expr_type))
    })?;
    if let Some(validator) = entry.validator {
        validator(node)?;
    }
    node.return_type = entry.return_type;
    Ok(())
}

/// A parsed, bound expression ready for repeated evaluation against
/// different memories.
#[derive(Clone)]
pub struct Expression {
    root: Arc<AstNode>,
}

impl Expression {
    /// Parses and validates `source`, returning an `Expression` bound to
    /// the function registry. Validation failures surface here, not in
    /// `try_evaluate`.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let mut root = adaptive_expr_parse::parse(source)
            .map_err(|e| ExpressionError::validation(e.to_string()))?;
        validate_tree(&mut root)?;
        Ok(Expression {
            root: Arc::new(root),
        })
    }

    pub fn from_ast(mut root: AstNode) -> Result<Self, ExpressionError> {
        validate_tree(&mut root)?;
        Ok(Expression {
            root: Arc::new(root),
        })
    }

    /// `tryEvaluate(state, options) → (value, error)`.
    pub fn try_evaluate(
        &self,
        memory: &mut dyn Memory,
        options: &Options,
    ) -> (Value, Option<ExpressionError>) {
        let span = tracing::info_span!("adaptive_expr_eval::try_evaluate");
        let _enter = span.enter();
        let mut state = EvalState::new(memory);
        try_evaluate_node(&self.root, &mut state, options)
    }

    /// `references() → set<string>`: every path read by an
    /// `accessor`/`element` chain that is not shadowed by an enclosing
    /// lambda's bound name.
    pub fn references(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        collect_references(&self.root, &[], &mut out);
        out
    }
}

fn collect_references(node: &AstNode, bound: &[&str], out: &mut HashSet<String>) {
    if node.is_literal() {
        return;
    }
    match node.expr_type.as_str() {
        "accessor" => {
            if let Some(name) = node.as_simple_accessor_name() {
                if !bound.contains(&name) {
                    out.insert(name.to_string());
                }
                return;
            }
            if let Some(path) = try_static_path(node) {
                if !bound.iter().any(|b| path == *b || path.starts_with(&format!("{b}."))) {
                    out.insert(path);
                }
                return;
            }
            for child in &node.children {
                collect_references(child, bound, out);
            }
        }
        "lambda" => {
            let mut nested: Vec<&str> = bound.to_vec();
            if let Some(param) = node.lambda_param.as_deref() {
                nested.push(param);
            }
            collect_references(&node.children[0], &nested, out);
        }
        "foreach" | "select" | "where" | "sortBy" | "sortByDescending" => {
            collect_references(&node.children[0], bound, out);
            if node.children.len() == 3 {
                if let Some(name) = node.children[1].as_simple_accessor_name() {
                    let mut nested: Vec<&str> = bound.to_vec();
                    nested.push(name);
                    collect_references(&node.children[2], &nested, out);
                    return;
                }
            }
            for child in &node.children[1..] {
                collect_references(child, bound, out);
            }
        }
        _ => {
            for child in &node.children {
                collect_references(child, bound, out);
            }
        }
    }
}

/// Best-effort static path reconstruction for a dotted `accessor` chain
/// (`a.b.c`), used only to make `references()` report human-readable
/// dotted paths for the common case; dynamic `element` subscripts fall
/// back to a per-child walk.
fn try_static_path(node: &AstNode) -> Option<String> {
    if node.expr_type != "accessor" || node.children.len() != 2 {
        return None;
    }
    let name = node.children[0].get_value().and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        _ => None,
    })?;
    let parent = &node.children[1];
    if let Some(parent_name) = parent.as_simple_accessor_name() {
        return Some(format!("{parent_name}.{name}"));
    }
    let parent_path = try_static_path(parent)?;
    Some(format!("{parent_path}.{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn evaluates_literal() {
        let expr = Expression::parse("42").unwrap();
        let mut memory = SimpleObjectMemory::empty();
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn references_reports_dotted_path() {
        let expr = Expression::parse("user.name").unwrap();
        let refs = expr.references();
        assert!(refs.contains("user.name"));
    }

    #[test]
    fn references_excludes_lambda_bound_name() {
        let expr = Expression::parse("foreach(items, x, x)").unwrap();
        let refs = expr.references();
        assert!(refs.contains("items"));
        assert!(!refs.contains("x"));
    }

    #[test]
    fn accessor_reads_from_memory() {
        let expr = Expression::parse("user.name").unwrap();
        let mut map = IndexMap::new();
        let mut user = IndexMap::new();
        user.insert("name".to_string(), Value::string("alice"));
        map.insert("user".to_string(), Value::Object(user));
        let mut memory = SimpleObjectMemory::new(Value::Object(map));
        let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
        assert!(error.is_none());
        assert_eq!(value, Value::string("alice"));
    }

    #[test]
    fn unknown_function_fails_validation() {
        assert!(Expression::parse("definitelyNotARealFunction(1)").is_err());
    }
}
