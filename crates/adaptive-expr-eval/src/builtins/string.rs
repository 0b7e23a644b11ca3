//! String family.

use std::collections::HashMap;

use adaptive_expr_common::{ExpressionError, ReturnType, Value};
use regex::Regex;

use crate::funcutil::{apply, validate_arity_and_any_type, validate_unary_string};
use crate::registry::{insert, FunctionEntry};

fn null_as_empty(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn require_string(v: &Value, label: &str) -> Result<String, ExpressionError> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(ExpressionError::type_error(format!(
            "{label}: expected a string, found {}",
            other.type_name()
        ))),
    }
}

/// Standard English ordinal: `n ≤ 0` returns the
/// decimal string unchanged.
fn add_ordinal(n: i64) -> String {
    if n <= 0 {
        return n.to_string();
    }
    let suffix = match (n % 100, n % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn sentence_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn register(map: &mut HashMap<String, FunctionEntry>) {
    insert(
        map,
        "concat",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, usize::MAX, ReturnType::OBJECT)),
        apply(
            |args| Ok(Value::String(args.iter().map(null_as_empty).collect())),
            None,
        ),
    );
    insert(
        map,
        "length",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::OBJECT)),
        apply(
            |args| Ok(Value::Int(null_as_empty(&args[0]).chars().count() as i64)),
            None,
        ),
    );
    insert(
        map,
        "replace",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 3, 3, ReturnType::STRING)),
        apply(
            |args| {
                let s = require_string(&args[0], "replace")?;
                let from = require_string(&args[1], "replace")?;
                let to = require_string(&args[2], "replace")?;
                Ok(Value::String(s.replace(&from, &to)))
            },
            None,
        ),
    );
    insert(
        map,
        "replaceIgnoreCase",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 3, 3, ReturnType::STRING)),
        apply(
            |args| {
                let s = require_string(&args[0], "replaceIgnoreCase")?;
                let from = require_string(&args[1], "replaceIgnoreCase")?;
                let to = require_string(&args[2], "replaceIgnoreCase")?;
                let re = Regex::new(&regex::escape(&from)).map_err(|e| ExpressionError::format(e.to_string()))?;
                let re = regex::RegexBuilder::new(re.as_str())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ExpressionError::format(e.to_string()))?;
                Ok(Value::String(re.replace_all(&s, to.as_str()).into_owned()))
            },
            None,
        ),
    );
    insert(
        map,
        "split",
        ReturnType::ARRAY,
        Some(|node| validate_arity_and_any_type(node, 1, 2, ReturnType::STRING)),
        apply(
            |args| {
                let s = require_string(&args[0], "split")?;
                let sep = if args.len() > 1 {
                    require_string(&args[1], "split")?
                } else {
                    String::new()
                };
                if s.is_empty() {
                    return Ok(Value::array([]));
                }
                let parts: Vec<Value> = if sep.is_empty() {
                    s.chars().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(sep.as_str()).map(Value::string).collect()
                };
                Ok(Value::Array(parts))
            },
            None,
        ),
    );
    insert(
        map,
        "substring",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 2, 3, ReturnType::OBJECT)),
        apply(
            |args| {
                let s = require_string(&args[0], "substring")?;
                let chars: Vec<char> = s.chars().collect();
                let start = args[1]
                    .as_f64()
                    .ok_or_else(|| ExpressionError::type_error("substring: start must be a number"))?
                    as i64;
                if start < 0 || start as usize > chars.len() {
                    return Err(ExpressionError::reference("substring: start index out of range"));
                }
                let len = if args.len() > 2 {
                    args[2]
                        .as_f64()
                        .ok_or_else(|| ExpressionError::type_error("substring: length must be a number"))?
                        as i64
                } else {
                    chars.len() as i64 - start
                };
                let end = (start + len).min(chars.len() as i64).max(start);
                Ok(Value::String(chars[start as usize..end as usize].iter().collect()))
            },
            None,
        ),
    );
    insert(
        map,
        "toLower",
        ReturnType::STRING,
        Some(validate_unary_string),
        apply(|args| Ok(Value::String(require_string(&args[0], "toLower")?.to_lowercase())), None),
    );
    insert(
        map,
        "toUpper",
        ReturnType::STRING,
        Some(validate_unary_string),
        apply(|args| Ok(Value::String(require_string(&args[0], "toUpper")?.to_uppercase())), None),
    );
    insert(
        map,
        "trim",
        ReturnType::STRING,
        Some(validate_unary_string),
        apply(|args| Ok(Value::String(require_string(&args[0], "trim")?.trim().to_string())), None),
    );
    insert(
        map,
        "startsWith",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::STRING)),
        apply(
            |args| Ok(Value::Boolean(null_as_empty(&args[0]).starts_with(&null_as_empty(&args[1])))),
            None,
        ),
    );
    insert(
        map,
        "endsWith",
        ReturnType::BOOLEAN,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::STRING)),
        apply(
            |args| Ok(Value::Boolean(null_as_empty(&args[0]).ends_with(&null_as_empty(&args[1])))),
            None,
        ),
    );
    insert(
        map,
        "countWord",
        ReturnType::NUMBER,
        Some(validate_unary_string),
        apply(
            |args| {
                let s = require_string(&args[0], "countWord")?;
                Ok(Value::Int(s.split_whitespace().count() as i64))
            },
            None,
        ),
    );
    insert(
        map,
        "addOrdinal",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 1, 1, ReturnType::NUMBER)),
        apply(
            |args| {
                let n = args[0]
                    .as_f64()
                    .ok_or_else(|| ExpressionError::type_error("addOrdinal: expected a number"))?
                    as i64;
                Ok(Value::String(add_ordinal(n)))
            },
            None,
        ),
    );
    insert(
        map,
        "newGuid",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 0, 0, ReturnType::OBJECT)),
        apply(|_args| Ok(Value::String(uuid::Uuid::new_v4().to_string())), None),
    );
    insert(
        map,
        "indexOf",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| match (&args[0], &args[1]) {
                (Value::Array(items), needle) => Ok(Value::Int(
                    items
                        .iter()
                        .position(|v| super::logical::value_equals(v, needle))
                        .map(|i| i as i64)
                        .unwrap_or(-1),
                )),
                (haystack, needle) => {
                    let haystack = null_as_empty(haystack);
                    let needle = null_as_empty(needle);
                    Ok(Value::Int(
                        haystack
                            .find(&needle)
                            .map(|byte_idx| haystack[..byte_idx].chars().count() as i64)
                            .unwrap_or(-1),
                    ))
                }
            },
            None,
        ),
    );
    insert(
        map,
        "lastIndexOf",
        ReturnType::NUMBER,
        Some(|node| validate_arity_and_any_type(node, 2, 2, ReturnType::OBJECT)),
        apply(
            |args| match (&args[0], &args[1]) {
                (Value::Array(items), needle) => Ok(Value::Int(
                    items
                        .iter()
                        .rposition(|v| super::logical::value_equals(v, needle))
                        .map(|i| i as i64)
                        .unwrap_or(-1),
                )),
                (haystack, needle) => {
                    let haystack = null_as_empty(haystack);
                    let needle = null_as_empty(needle);
                    Ok(Value::Int(
                        haystack
                            .rfind(&needle)
                            .map(|byte_idx| haystack[..byte_idx].chars().count() as i64)
                            .unwrap_or(-1),
                    ))
                }
            },
            None,
        ),
    );
    insert(
        map,
        "sentenceCase",
        ReturnType::STRING,
        Some(validate_unary_string),
        apply(|args| Ok(Value::String(sentence_case(&require_string(&args[0], "sentenceCase")?))), None),
    );
    insert(
        map,
        "titleCase",
        ReturnType::STRING,
        Some(validate_unary_string),
        apply(|args| Ok(Value::String(title_case(&require_string(&args[0], "titleCase")?))), None),
    );
    insert(
        map,
        "EOL",
        ReturnType::STRING,
        Some(|node| validate_arity_and_any_type(node, 0, 0, ReturnType::OBJECT)),
        apply(|_args| Ok(Value::String("\r\n".to_string())), None),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Expression;
    use crate::memory::SimpleObjectMemory;
    use crate::options::Options;

    fn eval(src: &str) -> Value {
        let expr = Expression::parse(src).unwrap();
        let mut mem = SimpleObjectMemory::empty();
        let (v, e) = expr.try_evaluate(&mut mem, &Options::new());
        assert!(e.is_none(), "unexpected error: {e:?}");
        v
    }

    #[test]
    fn split_empty_separator_splits_per_character() {
        assert_eq!(eval("split('ab', '')"), Value::array([Value::string("a"), Value::string("b")]));
    }

    #[test]
    fn split_empty_string_is_empty_array() {
        assert_eq!(eval("split('', '')"), Value::array([]));
    }

    #[test]
    fn ends_with_null_is_true() {
        assert_eq!(eval("endsWith('abc', null)"), Value::Boolean(true));
    }

    #[test]
    fn add_ordinal_non_positive_is_unchanged() {
        assert_eq!(eval("addOrdinal(0)"), Value::string("0"));
        assert_eq!(eval("addOrdinal(1)"), Value::string("1st"));
        assert_eq!(eval("addOrdinal(11)"), Value::string("11th"));
    }
}
