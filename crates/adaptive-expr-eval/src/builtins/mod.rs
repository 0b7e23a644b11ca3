//! Built-in function catalog: evaluators grouped by function family, each
//! module owning its own `register` that inserts entries into the shared
//! registry map.

pub mod arithmetic;
pub mod collection;
pub mod conversions;
pub mod datetime;
pub mod higher_order;
pub mod logical;
pub mod memory_access;
pub mod object;
pub mod string;
pub mod timex;
pub mod uri_regex;

use std::collections::HashMap;

use crate::registry::FunctionEntry;

/// Registers every builtin family. Called exactly once, lazily, from
/// [`crate::registry`]'s `Lazy` initializer.
pub fn register_all(map: &mut HashMap<String, FunctionEntry>) {
    memory_access::register(map);
    arithmetic::register(map);
    logical::register(map);
    string::register(map);
    collection::register(map);
    higher_order::register(map);
    conversions::register(map);
    datetime::register(map);
    timex::register(map);
    object::register(map);
    uri_regex::register(map);
}
