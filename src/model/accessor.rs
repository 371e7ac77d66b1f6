//! Accessor bound to a single field of an instance

use crate::errors::{ModelError, ModelResult};
use crate::value::Native;

use super::instance::Model;

/// Get/set/delete for one declared field.
///
/// Reads see pending input before accepted data, writes go to pending.
#[derive(Debug)]
pub struct FieldAccessor<'m> {
    model: &'m mut Model,
    name: String,
}

impl<'m> FieldAccessor<'m> {
    pub(crate) fn new(model: &'m mut Model, name: &str) -> ModelResult<Self> {
        if !model.schema().has_field(name) {
            return Err(ModelError::unknown_field(model.schema().name(), name));
        }
        Ok(Self {
            model,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> ModelResult<Native> {
        self.model.get(&self.name)
    }

    pub fn set(&mut self, value: impl Into<Native>) -> ModelResult<()> {
        self.model.set(&self.name, value)
    }

    pub fn delete(&mut self) -> ModelResult<Option<Native>> {
        self.model.delete(&self.name)
    }
}
