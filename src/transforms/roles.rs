//! Role resolution for exports

use crate::schema::{ExportPolicy, Role, Schema};

/// Active filter for one export traversal.
#[derive(Debug, Clone, Copy)]
pub struct RoleFilter<'s> {
    role: Option<&'s Role>,
}

impl<'s> RoleFilter<'s> {
    /// Resolves `requested` against `schema`.
    ///
    /// A role the schema does not define falls back to the schema's default
    /// role; without one, nothing is filtered.
    pub fn resolve(schema: &'s Schema, requested: Option<&str>) -> Self {
        let role = requested
            .and_then(|name| schema.role(name))
            .or_else(|| {
                schema
                    .options()
                    .default_role
                    .as_deref()
                    .and_then(|name| schema.role(name))
            });
        Self { role }
    }

    /// Filter that lets everything through
    pub fn open() -> Self {
        Self { role: None }
    }

    pub fn role(&self) -> Option<&'s Role> {
        self.role
    }

    /// Returns true if a member named `name` belongs in the output.
    pub fn includes(&self, name: &str, policy: ExportPolicy) -> bool {
        match policy {
            ExportPolicy::Never => false,
            ExportPolicy::Always => true,
            ExportPolicy::Default => self.role.map_or(true, |role| role.includes(name)),
        }
    }
}
