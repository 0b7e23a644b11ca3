//! Path-based memory access: a trait callers implement over their own
//! storage, plus a default map/list-backed implementation
//! (`SimpleObjectMemory`) for the common case.

use indexmap::IndexMap;

use adaptive_expr_common::{ExpressionError, Value};

/// A logical mapping from dotted/indexed path strings to [`Value`]s.
/// Implementors only need `get_value`/`set_value`; path parsing and
/// traversal live in `access_property`/`access_index` below, shared by
/// every implementation.
pub trait Memory {
    fn get_value(&self, path: &str) -> Value;
    fn set_value(&mut self, path: &str, value: Value);
    /// Monotonic token bumped on every write; callers may use it to
    /// invalidate caches. Optional — the default never changes.
    fn version(&self) -> u64 {
        0
    }
}

/// The default `Memory` implementation over a tree of maps/lists, the
/// shape a JSON document naturally produces.
#[derive(Debug, Clone, Default)]
pub struct SimpleObjectMemory {
    root: Value,
    version: u64,
}

impl SimpleObjectMemory {
    pub fn new(root: Value) -> Self {
        Self { root, version: 0 }
    }

    pub fn empty() -> Self {
        Self::new(Value::Object(IndexMap::new()))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl Memory for SimpleObjectMemory {
    fn get_value(&self, path: &str) -> Value {
        get_path(&self.root, path)
    }

    fn set_value(&mut self, path: &str, value: Value) {
        set_path(&mut self.root, path, value);
        self.version += 1;
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone)]
enum PathSegment {
    Property(String),
    Index(i64),
}

/// Splits `a.b[3].c['k']` into segments. Unknown-shaped paths degrade to a
/// single property segment rather than erroring — memory reads never error
///.
fn split_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut current = String::new();
    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
                if !current.is_empty() {
                    segments.push(PathSegment::Property(std::mem::take(&mut current)));
                }
            }
            '[' => {
                chars.next();
                if !current.is_empty() {
                    segments.push(PathSegment::Property(std::mem::take(&mut current)));
                }
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.trim();
                if let Some(stripped) = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                {
                    segments.push(PathSegment::Property(stripped.to_string()));
                } else if let Ok(i) = inner.parse::<i64>() {
                    segments.push(PathSegment::Index(i));
                } else if !inner.is_empty() {
                    segments.push(PathSegment::Property(inner.to_string()));
                }
            }
            _ => {
                current.push(c);
                chars.next();
            }
        }
    }
    if !current.is_empty() {
        segments.push(PathSegment::Property(current));
    }
    segments
}

fn get_path(root: &Value, path: &str) -> Value {
    let segments = split_path(path);
    let mut current = root.clone();
    for seg in segments {
        current = match seg {
            PathSegment::Property(name) => access_property(&current, &name),
            PathSegment::Index(i) => match access_index(&current, i) {
                Ok(v) => v,
                Err(_) => Value::Null,
            },
        };
        if current.is_null() {
            return Value::Null;
        }
    }
    current
}

fn set_path(root: &mut Value, path: &str, value: Value) {
    let segments = split_path(path);
    let mut cursor = root;
    for (i, seg) in segments.iter().enumerate() {
        let is_last = i == segments.len() - 1;
        match seg {
            PathSegment::Property(name) => {
                if !matches!(cursor, Value::Object(_)) {
                    *cursor = Value::Object(IndexMap::new());
                }
                let Value::Object(map) = cursor else {
                    unreachable!()
                };
                if is_last {
                    map.insert(name.clone(), value);
                    return;
                }
                cursor = map.entry(name.clone()).or_insert_with(|| Value::Object(IndexMap::new()));
            }
            PathSegment::Index(idx) => {
                if !matches!(cursor, Value::Array(_)) {
                    *cursor = Value::Array(Vec::new());
                }
                let Value::Array(items) = cursor else {
                    unreachable!()
                };
                let idx = *idx as usize;
                while items.len() <= idx {
                    items.push(Value::Null);
                }
                if is_last {
                    items[idx] = value;
                    return;
                }
                cursor = &mut items[idx];
            }
        }
    }
}

/// `accessProperty(inst, name)`: exact key, then
/// case-insensitive fallback taking the first match in iteration order
/// (deterministic because `Object` is an `IndexMap`). Never errors.
pub fn access_property(inst: &Value, name: &str) -> Value {
    let Value::Object(map) = inst else {
        return Value::Null;
    };
    if let Some(v) = map.get(name) {
        return v.clone();
    }
    let lower = name.to_lowercase();
    for (k, v) in map {
        if k.to_lowercase() == lower {
            return v.clone();
        }
    }
    Value::Null
}

/// `accessIndex(inst, i)`: list indexing with bounds checking;
/// `null` instance returns `null`, not an error.
pub fn access_index(inst: &Value, i: i64) -> Result<Value, ExpressionError> {
    match inst {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            if i < 0 || i as usize >= items.len() {
                Err(ExpressionError::reference(format!(
                    "index {i} is out of range for a collection of length {}",
                    items.len()
                )))
            } else {
                Ok(items[i as usize].clone())
            }
        }
        other => Err(ExpressionError::reference(format!(
            "{other} is not a collection."
        ))),
    }
}

/// A push-down stack of memories. Reads scan top-down, first
/// non-null hit wins; writes always target the base frame.
pub struct StackedMemory<'a> {
    base: &'a mut dyn Memory,
    frames: Vec<SimpleObjectMemory>,
}

impl<'a> StackedMemory<'a> {
    pub fn wrap(base: &'a mut dyn Memory) -> Self {
        Self {
            base,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: SimpleObjectMemory) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Memory for StackedMemory<'_> {
    fn get_value(&self, path: &str) -> Value {
        for frame in self.frames.iter().rev() {
            let v = frame.get_value(path);
            if !v.is_null() {
                return v;
            }
        }
        self.base.get_value(path)
    }

    fn set_value(&mut self, path: &str, value: Value) {
        self.base.set_value(path, value);
    }

    fn version(&self) -> u64 {
        self.base.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_missing_path_as_null() {
        let mem = SimpleObjectMemory::empty();
        assert!(mem.get_value("a.b.c").is_null());
    }

    #[test]
    fn case_insensitive_fallback() {
        let mut map = IndexMap::new();
        map.insert("Name".to_string(), Value::string("alice"));
        let mem = SimpleObjectMemory::new(Value::Object(map));
        assert_eq!(mem.get_value("name"), Value::string("alice"));
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut mem = SimpleObjectMemory::empty();
        mem.set_value("path.simple", Value::Int(3));
        assert_eq!(mem.get_value("path.simple"), Value::Int(3));
    }

    #[test]
    fn stacked_memory_prefers_top_frame() {
        let mut base = SimpleObjectMemory::empty();
        base.set_value("x", Value::Int(1));
        let mut stacked = StackedMemory::wrap(&mut base);
        let mut frame = SimpleObjectMemory::empty();
        frame.set_value("x", Value::Int(2));
        stacked.push(frame);
        assert_eq!(stacked.get_value("x"), Value::Int(2));
        stacked.pop();
        assert_eq!(stacked.get_value("x"), Value::Int(1));
    }

    #[test]
    fn array_index_out_of_range_errors() {
        let arr = Value::array([Value::Int(1)]);
        assert!(access_index(&arr, 5).is_err());
    }

    #[test]
    fn array_index_on_null_is_null_not_error() {
        assert_eq!(access_index(&Value::Null, 0).unwrap(), Value::Null);
    }
}
