//! Evaluation options.

use adaptive_expr_common::Value;

/// Recognized evaluation-time hints. `null_substitution` supplies a
/// fallback value for a path that resolves to `null`; `locale`/`timezone`
/// are consulted by the datetime builtins.
#[derive(Default)]
pub struct Options {
    pub null_substitution: Option<Box<dyn Fn(&str) -> Value>>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_null_substitution(mut self, f: impl Fn(&str) -> Value + 'static) -> Self {
        self.null_substitution = Some(Box::new(f));
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    /// `wrapGetValue`: the null-substitution fallback, applied
    /// by the accessor/element builtins after a memory read comes back
    /// null.
    pub fn substitute_null(&self, path: &str, value: Value) -> Value {
        if value.is_null() {
            if let Some(f) = &self.null_substitution {
                return f(path);
            }
        }
        value
    }
}
