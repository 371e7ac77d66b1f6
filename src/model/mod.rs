//! Runtime instances
//!
//! A `Model` binds data to a compiled schema. It converts on construction,
//! validates on demand, and exports through the schema's traversals.

mod accessor;
mod atoms;
pub(crate) mod equality;
mod instance;
mod snapshot;

pub use accessor::FieldAccessor;
pub use atoms::{Atom, Atoms};
pub use equality::{models_equal, natives_equal};
pub use instance::Model;
