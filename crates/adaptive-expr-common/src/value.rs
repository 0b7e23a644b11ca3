use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;

use crate::ExpressionError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A partially-specified date/time/duration expression (e.g. "next Monday",
/// "Wednesday morning"). Opaque to everything except the timex builtin
/// family; carried verbatim between evaluations.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timex {
    pub expression: String,
}

impl Timex {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

impl Display for Timex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// The dynamic value domain `V`: any of null, boolean, integer,
/// floating number, string, byte sequence, ordered list, unordered mapping,
/// date-time instant, or opaque domain object.
///
/// `Int` and `Number` share one numeric domain for arithmetic but are
/// kept as distinct variants rather than folded into one float — `isInteger`/
/// `isFloat` and integer-preserving arithmetic need to tell them apart.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    DateTime(DateTime<FixedOffset>),
    Timex(Timex),
    Error(ExpressionError),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Whole-valued number, including a float whose fractional part is
    /// zero.
    pub fn is_integer_valued(&self) -> bool {
        match self {
            Value::Int(_) => true,
            Value::Number(n) => n.fract() == 0.0 && n.is_finite(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Truthiness (`isLogicTrue`): `false` and `null` are false;
    /// everything else — including `0`, `""` and empty collections — is
    /// true. This diverges from most languages and must be preserved.
    pub fn is_logic_true(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "binary",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::DateTime(_) => "datetime",
            Value::Timex(_) => "timex",
            Value::Error(_) => "error",
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::Boolean(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Number(n) => n.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Array(a) => a.hash(state),
            Value::Object(o) => {
                for (k, v) in o {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::DateTime(dt) => dt.hash(state),
            Value::Timex(t) => t.hash(state),
            Value::Error(e) => e.to_string().hash(state),
        }
    }
}

/// Structural equality used for Rust-level comparisons (HashMap keys,
/// `assert_eq!` in tests). The *language-level* `equals`/`==` semantics
/// (null handling, numeric tolerance, empty-collection equivalence) live in
/// `adaptive_expr_eval::builtins::logical::value_equals` —  calls
/// out tolerance explicitly, which this derive cannot express.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Number(a), Number(b)) => a.to_bits() == b.to_bits(),
            (Int(a), Number(b)) | (Number(b), Int(a)) => *a as f64 == *b,
            (String(a), String(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Timex(a), Timex(b)) => a == b,
            (Error(a), Error(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Object(map) => write!(f, "{}", render_object(map)),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Timex(t) => write!(f, "{t}"),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}

/// Renders a map the way the platform's canonical representation does:
/// `{'key': value, ...}`, Python-style single-quoted keys. This exact
/// textual form is compatibility-critical for template-interpolation
/// consumers and must not drift.
pub fn render_object(map: &IndexMap<String, Value>) -> String {
    let mut out = String::from("{");
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('\'');
        out.push_str(k);
        out.push_str("': ");
        out.push_str(&render_nested(v));
    }
    out.push('}');
    out
}

fn render_nested(v: &Value) -> String {
    match v {
        Value::String(s) => format!("'{s}'"),
        Value::Object(map) => render_object(map),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render_nested).collect();
            format!("[{}]", parts.join(", "))
        }
        other => other.to_string(),
    }
}
