//! Value model, type lattice and error taxonomy shared by the
//! adaptive-expressions parser and evaluator.

pub mod error;
pub mod return_type;
pub mod value;

pub use error::{ExpressionError, ExpressionErrorKind};
pub use return_type::ReturnType;
pub use value::{Timex, Value, render_object};
