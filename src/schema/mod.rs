//! Schema declaration and compilation
//!
//! A schema is declared once through a `Declaration` and compiled into an
//! immutable `Schema` that every traversal consults.
//!
//! # Design Principles
//!
//! - Field order is stable: ancestors first, overrides keep their slot
//! - Compilation is the only place declarations are checked
//! - A compiled schema is shared read-only (`Arc<Schema>`)

mod compiler;
mod errors;
mod types;

pub use compiler::{compile, Declaration, VALIDATOR_PREFIX};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use types::{
    DefaultFactory, DefaultValue, ExportPolicy, Field, FieldType, FieldValidator,
    InstanceValidator, ReprInfo, Role, RoleMode, Schema, SchemaLink, SchemaOptions, Serializer,
    ValidationScope, ValidatorError,
};
