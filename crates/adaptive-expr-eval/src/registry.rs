//! Function registry & binding.
//!
//! A process-wide, frozen-after-init table mapping function identifier to
//! its evaluator/validator/declared-return-type, realized as a plain
//! `once_cell::sync::Lazy<HashMap<...>>` — registration happens once, at
//! first use, and reads vastly outnumber writes, so a lock-free concurrent
//! map is unneeded machinery here (see DESIGN.md).

use std::collections::HashMap;

use adaptive_expr_common::ReturnType;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::funcutil::{RawEvaluator, Validator};

pub struct FunctionEntry {
    pub evaluator: RawEvaluator,
    pub validator: Option<Validator>,
    pub return_type: ReturnType,
}

static REGISTRY: Lazy<HashMap<String, FunctionEntry>> = Lazy::new(|| {
    tracing::info_span!("adaptive_expr_eval::registry_init").in_scope(|| {
        let mut map = HashMap::new();
        crate::builtins::register_all(&mut map);
        trace!(count = map.len(), "registered builtin functions");
        map
    })
});

pub fn get(name: &str) -> Option<&'static FunctionEntry> {
    REGISTRY.get(name)
}

pub fn is_known(name: &str) -> bool {
    REGISTRY.contains_key(name)
}

pub(crate) fn insert(
    map: &mut HashMap<String, FunctionEntry>,
    name: &str,
    return_type: ReturnType,
    validator: Option<Validator>,
    evaluator: RawEvaluator,
) {
    map.insert(
        name.to_string(),
        FunctionEntry {
            evaluator,
            validator,
            return_type,
        },
    );
}
