//! Standard field kinds
//!
//! Each kind implements `FieldType`: conversion from raw input, validation
//! of its own constraints, export and mock generation. The engine knows
//! kinds only through that trait.

mod base;
mod compound;
mod identifier;
mod number;
mod temporal;

pub use base::{BoolType, StringType};
pub use compound::{ListType, ModelType};
pub use identifier::UuidType;
pub use number::{FloatType, IntType};
pub use temporal::DateType;

use crate::errors::{ErrorKind, ErrorTree, FieldError};
use crate::value::Native;

/// Renders a raw value for error messages.
pub(crate) fn describe(value: &Native) -> String {
    match value {
        Native::Str(s) => s.clone(),
        Native::Model(_) => value.type_name().to_string(),
        other => other.to_json().to_string(),
    }
}

/// Folds the messages of one validation into a result.
pub(crate) fn failures<S: Into<String>>(messages: Vec<S>) -> Result<(), ErrorTree> {
    if messages.is_empty() {
        return Ok(());
    }
    Err(ErrorTree::Messages(
        messages
            .into_iter()
            .map(|message| FieldError::new(ErrorKind::Validation, message))
            .collect(),
    ))
}
