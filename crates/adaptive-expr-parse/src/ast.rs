use std::fmt::{self, Display};

use adaptive_expr_common::{ReturnType, Value};

/// A parsed expression node.
///
/// `children` is immutable after construction. `return_type` starts as the
/// node's intrinsic type (a literal's own type, `Object` for everything
/// else) and is rebound once to the function registry's declared return
/// type during `validate_tree`, which runs once at bind time and owns the
/// tree exclusively (it has not yet been shared behind the `Expression`'s
/// `Arc`). After that the node — and the return type it carries — never
/// changes again, so a plain field is enough: no interior mutability, and
/// the tree stays `Send + Sync` for concurrent evaluation across threads.
#[derive(Debug, Clone)]
pub struct AstNode {
    /// The function identifier, e.g. `"add"`, `"accessor"`, `"element"`,
    /// `"createArray"`, `"foreach"`. Literal nodes use `"literal"`.
    pub expr_type: String,
    pub children: Vec<AstNode>,
    pub return_type: ReturnType,
    /// Present only on literal nodes; reachable via `get_value()`.
    pub literal: Option<Value>,
    /// Present only on the iterator-name child of a higher-order form when
    /// it was written as a lambda `(name) => body` rather than a bare
    /// accessor; the parser records the bound name directly.
    pub lambda_param: Option<String>,
    /// Original source text, used to build error messages that name the
    /// offending sub-expression.
    pub source_text: String,
}

impl AstNode {
    pub fn literal(value: Value, source_text: impl Into<String>) -> Self {
        let return_type = value.return_type();
        AstNode {
            expr_type: "literal".to_string(),
            children: Vec::new(),
            return_type,
            literal: Some(value),
            lambda_param: None,
            source_text: source_text.into(),
        }
    }

    pub fn call(
        expr_type: impl Into<String>,
        children: Vec<AstNode>,
        source_text: impl Into<String>,
    ) -> Self {
        AstNode {
            expr_type: expr_type.into(),
            children,
            return_type: ReturnType::OBJECT,
            literal: None,
            lambda_param: None,
            source_text: source_text.into(),
        }
    }

    pub fn lambda(
        param: impl Into<String>,
        body: AstNode,
        source_text: impl Into<String>,
    ) -> Self {
        AstNode {
            expr_type: "lambda".to_string(),
            children: vec![body],
            return_type: ReturnType::OBJECT,
            literal: None,
            lambda_param: Some(param.into()),
            source_text: source_text.into(),
        }
    }

    pub fn is_literal(&self) -> bool {
        self.literal.is_some()
    }

    pub fn get_value(&self) -> Option<&Value> {
        self.literal.as_ref()
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    /// Whether this node is an `accessor` with a single plain-identifier
    /// child, the shape `validateForeach` requires for the iterator-name
    /// position.
    pub fn as_simple_accessor_name(&self) -> Option<&str> {
        if self.expr_type == "accessor" && self.children.len() == 1 {
            self.children[0].literal.as_ref().and_then(|v| match v {
                Value::String(s) => Some(s.as_str()),
                _ => None,
            })
        } else {
            None
        }
    }
}

impl Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_text)
    }
}
