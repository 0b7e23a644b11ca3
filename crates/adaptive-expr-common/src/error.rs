//! Error taxonomy for expression parsing and evaluation.
//!
//! - `ExpressionErrorKind` — the six recognised error categories.
//! - `ExpressionError` — kind plus a human-readable message carrying the
//!   offending sub-expression's text, the way the source expects.
//!
//! Modeled on `formualizer_common::ExcelError`'s kind+message+Display
//! composition, minus the spreadsheet-specific row/col/origin context this
//! engine has no use for (there are no cells here, only memory paths).

use std::error::Error;
use std::fmt;

/// The six error categories named in .
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionErrorKind {
    /// Arity/type mismatch raised at bind time, before evaluation starts.
    Validation,
    /// Out-of-range index or non-collection indexing.
    Reference,
    /// A verifier rejected an argument's dynamic value.
    Type,
    /// ISO-timestamp parse failure, invalid timex, invalid base64, etc.
    Format,
    /// Division by zero, invalid time unit, and similar domain errors.
    Domain,
    /// Any other evaluator-thrown failure, coerced to its message text.
    Evaluation,
}

impl fmt::Display for ExpressionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validation => "ValidationError",
            Self::Reference => "ReferenceError",
            Self::Type => "TypeError",
            Self::Format => "FormatError",
            Self::Domain => "DomainError",
            Self::Evaluation => "EvaluationError",
        })
    }
}

/// The error value threaded through `try_evaluate`'s `(value, error)` pair
///. Rendered as a plain string when it needs to travel as
/// the second tuple element of a dynamic evaluation failure, or wrapped in
/// `Value::Error` when a consumer wants to keep carrying it as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionError {
    pub kind: ExpressionErrorKind,
    pub message: String,
}

impl ExpressionError {
    pub fn new(kind: ExpressionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ExpressionErrorKind::Validation, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ExpressionErrorKind::Reference, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExpressionErrorKind::Type, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ExpressionErrorKind::Format, message)
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(ExpressionErrorKind::Domain, message)
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ExpressionErrorKind::Evaluation, message)
    }
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ExpressionError {}

impl From<ExpressionError> for String {
    fn from(e: ExpressionError) -> Self {
        e.message
    }
}

impl From<ExpressionError> for crate::Value {
    fn from(e: ExpressionError) -> Self {
        crate::Value::Error(e)
    }
}
