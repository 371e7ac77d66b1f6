//! UUID kind

use uuid::Uuid;

use super::describe;
use crate::context::Context;
use crate::errors::{ErrorTree, MockError};
use crate::schema::{Field, FieldType};
use crate::value::Native;

/// RFC 4122 identifier, hyphenated in primitive output
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidType;

impl UuidType {
    pub fn new() -> Self {
        Self
    }

    /// Field that receives a fresh v4 identifier when no value is given.
    pub fn auto_fill() -> Field {
        Field::new(Self).default_with(|| Native::Uuid(Uuid::new_v4()))
    }
}

impl FieldType for UuidType {
    fn type_name(&self) -> &'static str {
        "uuid"
    }

    fn convert(&self, value: Native, _ctx: &Context) -> Result<Native, ErrorTree> {
        match &value {
            Native::Uuid(id) => Ok(Native::Uuid(*id)),
            Native::Str(s) => Uuid::parse_str(s.trim()).map(Native::Uuid).map_err(|_| {
                ErrorTree::conversion(format!("Couldn't interpret '{}' value as UUID.", s))
            }),
            other => Err(ErrorTree::conversion(format!(
                "Couldn't interpret '{}' value as UUID.",
                describe(other)
            ))),
        }
    }

    fn validate(&self, value: &Native, _ctx: &Context) -> Result<(), ErrorTree> {
        match value {
            Native::Uuid(_) => Ok(()),
            other => Err(ErrorTree::validation(format!(
                "Couldn't interpret '{}' value as UUID.",
                describe(other)
            ))),
        }
    }

    fn mock(&self, _ctx: &Context) -> Result<Native, MockError> {
        Ok(Native::Uuid(Uuid::new_v4()))
    }
}
