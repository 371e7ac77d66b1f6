//! Call options
//!
//! Option structs for constructing, validating and exporting instances.
//! Each has a `Default` matching the documented defaults and `with_*`
//! builders for the rest.

use std::fmt;
use std::sync::Arc;

use crate::context::{AppData, Clock, Context, NameMapping, OutputShape};
use crate::transforms::FieldConverter;
use crate::value::NativeMap;

/// Options for constructing an instance.
#[derive(Clone)]
pub struct ModelOptions {
    /// Apply declared defaults to missing fields
    pub init: bool,
    /// Skip required-field enforcement
    pub partial: bool,
    /// Reject input keys the schema does not recognize
    pub strict: bool,
    /// Run full validation right away
    pub validate: bool,
    pub app_data: Option<AppData>,
    /// Alternate input keys per field
    pub mapping: NameMapping,
    /// Values accepted without conversion
    pub trusted: Option<NativeMap>,
    /// Source of "today" for this instance's traversals
    pub clock: Option<Arc<dyn Clock>>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            init: true,
            partial: true,
            strict: true,
            validate: false,
            app_data: None,
            mapping: NameMapping::new(),
            trusted: None,
            clock: None,
        }
    }
}

impl ModelOptions {
    /// Require every field and validate on construction.
    pub fn validated() -> Self {
        Self {
            partial: false,
            validate: true,
            ..Self::default()
        }
    }

    /// Ignore unknown keys instead of rejecting them.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    pub fn with_init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_app_data(mut self, app_data: AppData) -> Self {
        self.app_data = Some(app_data);
        self
    }

    /// Accept `field` from `alias` in raw input.
    pub fn with_alias(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.mapping.entry(field.into()).or_default().push(alias.into());
        self
    }

    pub fn with_trusted(mut self, trusted: NativeMap) -> Self {
        self.trusted = Some(trusted);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl fmt::Debug for ModelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("init", &self.init)
            .field("partial", &self.partial)
            .field("strict", &self.strict)
            .field("validate", &self.validate)
            .field("mapping", &self.mapping)
            .field("trusted", &self.trusted)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Options for re-validating an instance.
#[derive(Clone)]
pub struct ValidateOptions {
    /// Skip required-field enforcement
    pub partial: bool,
    /// Convert before validating
    pub convert: bool,
    pub app_data: Option<AppData>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            partial: false,
            convert: true,
            app_data: None,
        }
    }
}

impl ValidateOptions {
    pub fn partial() -> Self {
        Self {
            partial: true,
            ..Self::default()
        }
    }

    /// Validate values known to be converted already.
    pub fn without_conversion() -> Self {
        Self {
            convert: false,
            ..Self::default()
        }
    }

    pub fn with_app_data(mut self, app_data: AppData) -> Self {
        self.app_data = Some(app_data);
        self
    }
}

/// Options for exporting an instance.
#[derive(Clone, Default)]
pub struct ExportOptions {
    pub role: Option<String>,
    pub shape: OutputShape,
    pub app_data: Option<AppData>,
    /// Replaces each scalar field's own export
    pub field_converter: Option<Arc<dyn FieldConverter>>,
}

impl ExportOptions {
    pub fn native() -> Self {
        Self::default()
    }

    pub fn primitive() -> Self {
        Self {
            shape: OutputShape::Primitive,
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_shape(mut self, shape: OutputShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_app_data(mut self, app_data: AppData) -> Self {
        self.app_data = Some(app_data);
        self
    }

    pub fn with_field_converter(mut self, converter: Arc<dyn FieldConverter>) -> Self {
        self.field_converter = Some(converter);
        self
    }

    /// Builds the export context these options describe.
    pub fn context(&self) -> Context {
        Context::export(self.shape)
            .with_role(self.role.clone())
            .with_app_data(self.app_data.clone())
            .with_field_converter(self.field_converter.clone())
    }
}

impl fmt::Debug for ExportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportOptions")
            .field("role", &self.role)
            .field("shape", &self.shape)
            .field("field_converter", &self.field_converter.is_some())
            .finish()
    }
}
