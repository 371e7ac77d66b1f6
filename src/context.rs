//! Traversal context
//!
//! A `Context` bundles the parameters of one traversal call. It is never
//! edited in place: every `with_*` method consumes a copy and returns the
//! derived context, so a child traversal cannot disturb its parent.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::transforms::FieldConverter;

/// Opaque application data handed through to validators and field kinds.
pub type AppData = Arc<dyn Any + Send + Sync>;

/// Field name to the alternate input keys it may be read from.
pub type NameMapping = BTreeMap<String, Vec<String>>;

/// Output shape of an export pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// Rich in-memory values (dates, uuids, sub-instances)
    #[default]
    Native,
    /// Plain text/number/boolean/sequence/mapping trees
    Primitive,
}

/// Source of "today" for date constraints.
pub trait Clock: Send + Sync + fmt::Debug {
    fn today(&self) -> NaiveDate;
}

/// Reads the local system date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Parameters of one traversal call
#[derive(Clone)]
pub struct Context {
    partial: bool,
    strict: bool,
    convert: bool,
    validate: bool,
    apply_defaults: bool,
    role: Option<String>,
    app_data: Option<AppData>,
    mapping: Arc<NameMapping>,
    visited: Arc<BTreeSet<Uuid>>,
    active: Arc<BTreeSet<usize>>,
    shape: OutputShape,
    field_converter: Option<Arc<dyn FieldConverter>>,
    clock: Arc<dyn Clock>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            partial: false,
            strict: false,
            convert: true,
            validate: false,
            apply_defaults: true,
            role: None,
            app_data: None,
            mapping: Arc::new(NameMapping::new()),
            visited: Arc::new(BTreeSet::new()),
            active: Arc::new(BTreeSet::new()),
            shape: OutputShape::Native,
            field_converter: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversion only: coerce, do not validate.
    pub fn conversion() -> Self {
        Self::default()
    }

    /// Full validation with conversion.
    pub fn validation() -> Self {
        Self {
            validate: true,
            ..Self::default()
        }
    }

    /// Export in the given output shape.
    pub fn export(shape: OutputShape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn partial(&self) -> bool {
        self.partial
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn convert(&self) -> bool {
        self.convert
    }

    pub fn should_validate(&self) -> bool {
        self.validate
    }

    pub fn apply_defaults(&self) -> bool {
        self.apply_defaults
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn app_data(&self) -> Option<&AppData> {
        self.app_data.as_ref()
    }

    /// Downcasts the application data.
    pub fn app_data_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.app_data.as_ref().and_then(|data| data.downcast_ref::<T>())
    }

    pub fn mapping(&self) -> &NameMapping {
        &self.mapping
    }

    /// Alternate input keys configured for `field`.
    pub fn aliases(&self, field: &str) -> &[String] {
        self.mapping.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn shape(&self) -> OutputShape {
        self.shape
    }

    pub fn field_converter(&self) -> Option<&Arc<dyn FieldConverter>> {
        self.field_converter.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Returns true if schema `id` is on the current synthesis chain.
    pub fn has_visited(&self, id: Uuid) -> bool {
        self.visited.contains(&id)
    }

    /// Returns true if the instance at `address` is being traversed further up.
    pub(crate) fn is_active(&self, address: usize) -> bool {
        self.active.contains(&address)
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_apply_defaults(mut self, apply_defaults: bool) -> Self {
        self.apply_defaults = apply_defaults;
        self
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = role;
        self
    }

    pub fn with_app_data(mut self, app_data: Option<AppData>) -> Self {
        self.app_data = app_data;
        self
    }

    pub fn with_mapping(mut self, mapping: NameMapping) -> Self {
        self.mapping = Arc::new(mapping);
        self
    }

    pub fn with_shape(mut self, shape: OutputShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_field_converter(mut self, converter: Option<Arc<dyn FieldConverter>>) -> Self {
        self.field_converter = converter;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Adds `id` to a copy of the visited set.
    pub fn with_visited(mut self, id: Uuid) -> Self {
        let mut visited = (*self.visited).clone();
        visited.insert(id);
        self.visited = Arc::new(visited);
        self
    }

    pub(crate) fn with_active(mut self, address: usize) -> Self {
        let mut active = (*self.active).clone();
        active.insert(address);
        self.active = Arc::new(active);
        self
    }

    /// Derives the context for descending into a sub-schema field.
    ///
    /// Flags carry over unless the field overrides them. Name mappings
    /// address the parent's fields only and are dropped. The role name passes
    /// through unchanged; `RoleFilter` resolves it against the sub-schema's
    /// own roles, so deeper schemas that declare it still apply it.
    pub fn descend(&self, partial: Option<bool>, strict: Option<bool>) -> Self {
        self.clone()
            .with_partial(partial.unwrap_or(self.partial))
            .with_strict(strict.unwrap_or(self.strict))
            .with_mapping(NameMapping::new())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("partial", &self.partial)
            .field("strict", &self.strict)
            .field("convert", &self.convert)
            .field("validate", &self.validate)
            .field("apply_defaults", &self.apply_defaults)
            .field("role", &self.role)
            .field("mapping", &self.mapping)
            .field("visited", &self.visited)
            .field("shape", &self.shape)
            .field("clock", &self.clock)
            .finish()
    }
}
