//! Regex matching and URI decomposition builtins: `isMatch` plus the
//! `uriHost`/`uriPath`/`uriPathAndQuery`/`uriQuery`/`uriPort`/`uriScheme`
//! family, all backed by parsing the string as an absolute URI.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use regex::Regex;
use url::Url;

use crate::funcutil::{apply, validate_arity_and_any_type, verify_string};
use crate::registry::{insert, FunctionEntry};

/// `(?i)` prefix flag toggles case-insensitive matching; stripped before
/// compiling.
fn compile(pattern: &str) -> Result<Regex, ExpressionError> {
    let (body, case_insensitive) = match pattern.strip_prefix("(?i)") {
        Some(rest) => (rest, true),
        None => (pattern, false),
    };
    regex::RegexBuilder::new(body)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| ExpressionError::format(format!("isMatch: invalid pattern: {e}")))
}

fn parse_absolute_uri(s: &str, fn_name: &str) -> Result<Url, ExpressionError> {
    let url = Url::parse(s)
        .map_err(|e| ExpressionError::format(format!("{fn_name}: {e}")))?;
    if url.host_str().is_none() {
        return Err(ExpressionError::domain(
            "invalid operation, input uri should be an absolute URI",
        ));
    }
    Ok(url)
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "isMatch",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::STRING)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("isMatch: expected a string"));
                };
                let Value::String(pattern) = &args[1] else {
                    return Err(ExpressionError::type_error("isMatch: expected a string pattern"));
                };
                Ok(Value::Boolean(compile(pattern)?.is_match(s)))
            },
            Some(verify_string),
        ),
    );
    insert(
        map,
        "uriHost",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("uriHost: expected a string"));
                };
                let url = parse_absolute_uri(s, "uriHost")?;
                Ok(Value::String(url.host_str().unwrap_or("").to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "uriPath",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("uriPath: expected a string"));
                };
                let url = parse_absolute_uri(s, "uriPath")?;
                Ok(Value::String(url.path().to_string()))
            },
            None,
        ),
    );
    insert(
        map,
        "uriPathAndQuery",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("uriPathAndQuery: expected a string"));
                };
                let url = parse_absolute_uri(s, "uriPathAndQuery")?;
                let mut out = url.path().to_string();
                if let Some(q) = url.query() {
                    out.push('?');
                    out.push_str(q);
                }
                Ok(Value::String(out))
            },
            None,
        ),
    );
    insert(
        map,
        "uriQuery",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("uriQuery: expected a string"));
                };
                let url = parse_absolute_uri(s, "uriQuery")?;
                Ok(Value::String(
                    url.query().map(|q| format!("?{q}")).unwrap_or_default(),
                ))
            },
            None,
        ),
    );
    insert(
        map,
        "uriPort",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("uriPort: expected a string"));
                };
                let url = parse_absolute_uri(s, "uriPort")?;
                let port = url.port_or_known_default().unwrap_or(0);
                Ok(Value::Int(port as i64))
            },
            None,
        ),
    );
    insert(
        map,
        "uriScheme",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::STRING)),
        apply(
            |args| {
                let Value::String(s) = &args[0] else {
                    return Err(ExpressionError::type_error("uriScheme: expected a string"));
                };
                let url = parse_absolute_uri(s, "uriScheme")?;
                Ok(Value::String(url.scheme().to_string()))
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
    use crate::options::Options;

    fn eval(src: &str) -> (Value, Option<ExpressionError>) {
        let expr = Expression::parse(src).unwrap();
        let mut mem = SimpleObjectMemory::empty();
        expr.try_evaluate(&mut mem, &Options::new())
    }

    #[test]
    fn is_match_respects_case_insensitive_flag() {
        let (v, e) = eval("isMatch('Hello', '(?i)^hello$')");
        assert!(e.is_none());
        assert_eq!(v, Value::Boolean(true));
    }

    #[test]
    fn uri_host_extracts_authority() {
        let (v, e) = eval("uriHost('https://example.com:8080/a/b?x=1')");
        assert!(e.is_none());
        assert_eq!(v, Value::string("example.com"));
    }

    #[test]
    fn uri_port_rejects_relative_uri() {
        let (_, e) = eval("uriPort('/a/b')");
        assert!(e.is_some());
    }
}
