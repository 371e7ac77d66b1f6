//! Field-by-field view of an instance

use crate::schema::Field;
use crate::value::Native;

use super::instance::Model;

/// One field of an instance with its current value
#[derive(Debug, Clone, Copy)]
pub struct Atom<'a> {
    pub name: &'a str,
    pub field: &'a Field,
    /// `None` if the field holds no value
    pub value: Option<&'a Native>,
}

/// Lazy iterator over an instance's fields in schema order.
///
/// A clone continues from the same position; call `Model::atoms` again for
/// a fresh pass.
#[derive(Debug, Clone)]
pub struct Atoms<'a> {
    model: &'a Model,
    slot: usize,
}

impl<'a> Atoms<'a> {
    pub(crate) fn new(model: &'a Model) -> Self {
        Self { model, slot: 0 }
    }
}

impl<'a> Iterator for Atoms<'a> {
    type Item = Atom<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let field = self.model.schema().field_at(self.slot)?;
        self.slot += 1;
        let value = self
            .model
            .pending()
            .get(field.name())
            .or_else(|| self.model.accepted().get(field.name()));
        Some(Atom {
            name: field.name(),
            field,
            value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.model.schema().field_count().saturating_sub(self.slot);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Atoms<'_> {}
