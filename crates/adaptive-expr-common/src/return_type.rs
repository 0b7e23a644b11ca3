//! The static return-type lattice `R`: a bit set over
//! `{Boolean, Number, Object, String, Array}` used to validate a function
//! call's children before evaluation ever runs.
//!
//! A `bitflags!` capability set, same mechanism used for validating
//! argument types against a declared signature: compile-time bit flags
//! with `Ord`/`Hash` so they can double as map keys.

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ReturnType: u8 {
        const BOOLEAN = 0b0_0001;
        const NUMBER  = 0b0_0010;
        const OBJECT  = 0b0_0100;
        const STRING  = 0b0_1000;
        const ARRAY   = 0b1_0000;
    }
}

impl ReturnType {
    /// `Object` acts as a wildcard on either side of a validation check: a
    /// child is accepted if `declared & actual != 0`, or either side
    /// includes `Object`.
    pub fn accepts(declared: ReturnType, actual: ReturnType) -> bool {
        declared.contains(ReturnType::OBJECT)
            || actual.contains(ReturnType::OBJECT)
            || declared.intersects(actual)
    }
}

impl Default for ReturnType {
    fn default() -> Self {
        ReturnType::OBJECT
    }
}

impl crate::Value {
    /// The return type that best describes a concrete runtime value, used
    /// when the static lattice needs a placeholder for a literal child.
    pub fn return_type(&self) -> ReturnType {
        match self {
            crate::Value::Boolean(_) => ReturnType::BOOLEAN,
            crate::Value::Int(_) | crate::Value::Number(_) => ReturnType::NUMBER,
            crate::Value::String(_) => ReturnType::STRING,
            crate::Value::Array(_) => ReturnType::ARRAY,
            _ => ReturnType::OBJECT,
        }
    }
}
