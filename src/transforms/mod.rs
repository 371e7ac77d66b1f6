//! Schema-driven traversals
//!
//! Every operation on instance data is a walk over a compiled schema:
//! conversion and validation share `walk`, exports go through
//! `export_loop`.

mod export;
mod roles;
mod walk;

pub(crate) use export::model_address;
pub use export::{export_loop, to_native, to_primitive, FieldConverter};
pub use roles::RoleFilter;
pub use walk::{convert, validate, walk, WalkOutcome, WalkSource};
