//! Runtime instance bound to a compiled schema
//!
//! An instance keeps two stores:
//! - `pending`: converted input not yet validated
//! - `accepted`: values that passed validation (or were trusted)
//!
//! Validation never partially commits: `accepted` changes only when every
//! field and instance check passes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{ExportOptions, ModelOptions, ValidateOptions};
use crate::context::{Clock, Context};
use crate::errors::{DataError, ErrorTree, ModelError, ModelResult};
use crate::observability::{Event, Logger};
use crate::schema::Schema;
use crate::transforms::{self, WalkSource};
use crate::value::{ModelRef, Native, NativeMap};

use super::accessor::FieldAccessor;
use super::atoms::Atoms;
use super::snapshot::Snapshot;

/// An instance of a compiled schema
///
/// Cloning copies the whole tree of sub-instances; the copy shares no
/// mutable state with the original.
pub struct Model {
    schema: Arc<Schema>,
    pending: NativeMap,
    accepted: NativeMap,
    strict: bool,
    clock: Option<Arc<dyn Clock>>,
}

impl Model {
    /// Converts `raw` into a new instance.
    ///
    /// `raw` must be a mapping or null. Conversion failures for every field
    /// come back together; with `options.validate` the instance is also
    /// fully validated before it is returned.
    pub fn new(schema: &Arc<Schema>, raw: impl Into<Native>, options: ModelOptions) -> ModelResult<Self> {
        let raw = Self::raw_map(schema, raw.into())?;

        let mut model = Self {
            schema: Arc::clone(schema),
            pending: NativeMap::new(),
            accepted: options.trusted.clone().unwrap_or_default(),
            strict: options.strict,
            clock: options.clock.clone(),
        };

        let ctx = model
            .base_context()
            .with_partial(options.partial)
            .with_strict(options.strict)
            .with_apply_defaults(options.init)
            .with_app_data(options.app_data.clone())
            .with_mapping(options.mapping.clone());
        let source = WalkSource::new(&raw).with_trusted(&model.accepted);

        match transforms::convert(schema, &source, &ctx).into_result() {
            Ok(converted) => {
                Logger::trace(
                    Event::ModelConverted,
                    &[
                        ("fields", &converted.len().to_string()),
                        ("schema", schema.name()),
                    ],
                );
                model.pending = converted;
            }
            Err(errors) => {
                Logger::warn(
                    Event::ConversionFailed,
                    &[
                        ("errors", &errors.len().to_string()),
                        ("schema", schema.name()),
                    ],
                );
                return Err(errors.into());
            }
        }

        if options.validate {
            model.validate(ValidateOptions {
                app_data: options.app_data,
                ..ValidateOptions::default()
            })?;
        }

        Ok(model)
    }

    /// Converts a nested mapping with the context of the enclosing traversal.
    pub(crate) fn from_context(schema: &Arc<Schema>, raw: &NativeMap, ctx: &Context) -> Result<Self, DataError> {
        let converted = transforms::convert(schema, &WalkSource::new(raw), ctx).into_result()?;
        Ok(Self {
            schema: Arc::clone(schema),
            pending: converted,
            accepted: NativeMap::new(),
            strict: ctx.strict(),
            clock: None,
        })
    }

    fn raw_map(schema: &Schema, raw: Native) -> ModelResult<NativeMap> {
        match raw {
            Native::Null => Ok(NativeMap::new()),
            Native::Map(map) => Ok(map),
            other => {
                let mut errors = DataError::new();
                errors.push_instance(format!(
                    "{} expects a mapping, got {}",
                    schema.name(),
                    other.type_name()
                ));
                Err(errors.into())
            }
        }
    }

    fn base_context(&self) -> Context {
        match &self.clock {
            Some(clock) => Context::new().with_clock(Arc::clone(clock)),
            None => Context::new(),
        }
    }

    /// Validates the current state and commits it on success.
    ///
    /// Returns without doing anything when nothing is pending and
    /// `options.partial` is set. On failure neither this instance nor any
    /// sub-instance it reaches is changed.
    pub fn validate(&mut self, options: ValidateOptions) -> ModelResult<()> {
        if self.pending.is_empty() && options.partial {
            return Ok(());
        }
        let ctx = self
            .base_context()
            .with_partial(options.partial)
            .with_convert(options.convert)
            .with_apply_defaults(false)
            .with_app_data(options.app_data);

        let saved = Snapshot::capture(self);
        self.validate_with(&ctx).map_err(|err| {
            saved.restore(self);
            err
        })
    }

    /// Validation with a caller-built context; used for nested instances.
    pub(crate) fn validate_with(&mut self, ctx: &Context) -> ModelResult<()> {
        let source = WalkSource::new(&self.pending).with_trusted(&self.accepted);
        let outcome = transforms::validate(&self.schema, &source, ctx);

        match outcome.errors {
            Some(errors) => {
                Logger::warn(
                    Event::ValidationFailed,
                    &[
                        ("errors", &errors.len().to_string()),
                        ("schema", self.schema.name()),
                    ],
                );
                Err(errors.into())
            }
            None => {
                self.accepted.extend(outcome.data);
                self.pending.clear();
                Logger::trace(
                    Event::ValidationPassed,
                    &[("schema", self.schema.name())],
                );
                Ok(())
            }
        }
    }

    /// Converts `raw` into pending, then validates without reconverting.
    ///
    /// With `recursive`, a mapping given for a field that already holds a
    /// sub-instance is imported into that sub-instance instead of replacing
    /// it. A failed import leaves this instance and its sub-instances as
    /// they were.
    pub fn import_data(&mut self, raw: impl Into<Native>, recursive: bool) -> ModelResult<&mut Self> {
        let raw = Self::raw_map(&self.schema, raw.into())?;
        let saved = Snapshot::capture(self);
        match self.import_map(raw, recursive) {
            Ok(()) => Ok(self),
            Err(err) => {
                saved.restore(self);
                Err(err)
            }
        }
    }

    fn import_map(&mut self, raw: NativeMap, recursive: bool) -> ModelResult<()> {
        let mut direct = NativeMap::new();
        let mut nested_errors = DataError::new();
        for (key, value) in raw {
            let target = if recursive {
                self.nested_target(&key, &value)
            } else {
                None
            };
            let Some(target) = target else {
                direct.insert(key, value);
                continue;
            };
            let mut inner = target.try_borrow_mut().map_err(|_| ModelError::InstanceBusy {
                schema: self.schema.name().to_string(),
            })?;
            match inner.import_data(value, true) {
                Ok(_) => {}
                Err(ModelError::Data(errors)) => {
                    nested_errors.insert(key, ErrorTree::Nested(Box::new(errors)))
                }
                Err(other) => return Err(other),
            }
        }

        let ctx = self
            .base_context()
            .with_partial(true)
            .with_strict(self.strict)
            .with_apply_defaults(false);
        let outcome = transforms::convert(&self.schema, &WalkSource::new(&direct), &ctx);
        if let Some(errors) = outcome.errors {
            nested_errors.absorb(errors);
        }
        nested_errors.into_result()?;
        self.pending.extend(outcome.data);

        self.validate(ValidateOptions::without_conversion())
    }

    pub(crate) fn replace_stores(&mut self, pending: NativeMap, accepted: NativeMap) {
        self.pending = pending;
        self.accepted = accepted;
    }

    fn nested_target(&self, key: &str, value: &Native) -> Option<ModelRef> {
        let field = self.schema.field(key)?;
        field.kind().model_schema()?;
        value.as_map()?;
        self.current(key)?.as_model().cloned()
    }

    fn current(&self, name: &str) -> Option<&Native> {
        self.pending.get(name).or_else(|| self.accepted.get(name))
    }

    /// Exports in the shape and role `options` describe.
    pub fn export(&self, options: &ExportOptions) -> NativeMap {
        transforms::export_loop(&self.schema, self, &options.context())
    }

    pub fn to_native(&self, options: &ExportOptions) -> NativeMap {
        transforms::to_native(self, options)
    }

    pub fn to_primitive(&self, options: &ExportOptions) -> serde_json::Value {
        transforms::to_primitive(self, options)
    }

    /// Validates, then exports primitive output.
    pub fn serialize(&mut self, options: &ExportOptions) -> ModelResult<serde_json::Value> {
        self.validate(ValidateOptions::default())?;
        Ok(self.to_primitive(options))
    }

    /// Field name, field and current value, in schema order
    pub fn atoms(&self) -> Atoms<'_> {
        Atoms::new(self)
    }

    /// Current value of `name`.
    ///
    /// Pending input wins over accepted data. A field with neither falls
    /// back to its converted default; computed members are evaluated.
    pub fn get(&self, name: &str) -> ModelResult<Native> {
        if let Some(compute) = self.schema.serializable(name) {
            return Ok(compute(self));
        }
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| ModelError::unknown_field(self.schema.name(), name))?;
        if let Some(value) = self.current(name) {
            return Ok(value.clone());
        }
        let default = field
            .default()
            .ok_or_else(|| ModelError::undefined_value(self.schema.name(), name))?;
        field
            .kind()
            .convert(default.produce(), &self.base_context())
            .map_err(|tree| {
                let mut errors = DataError::new();
                errors.insert(name, tree);
                ModelError::Data(errors)
            })
    }

    /// Like `get`, returning `fallback` when the field has no value.
    pub fn get_or(&self, name: &str, fallback: Native) -> ModelResult<Native> {
        match self.get(name) {
            Err(ModelError::UndefinedValue { .. }) => Ok(fallback),
            other => other,
        }
    }

    /// Stores `value` as pending input; it is converted on the next
    /// validation.
    pub fn set(&mut self, name: &str, value: impl Into<Native>) -> ModelResult<()> {
        if !self.schema.has_field(name) {
            return Err(ModelError::unknown_field(self.schema.name(), name));
        }
        self.pending.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Removes the value of `name` from both stores.
    pub fn delete(&mut self, name: &str) -> ModelResult<Option<Native>> {
        if !self.schema.has_field(name) {
            return Err(ModelError::unknown_field(self.schema.name(), name));
        }
        let pending = self.pending.remove(name);
        let accepted = self.accepted.remove(name);
        Ok(pending.or(accepted))
    }

    /// Accessor bound to one field
    pub fn field_mut(&mut self, name: &str) -> ModelResult<FieldAccessor<'_>> {
        FieldAccessor::new(self, name)
    }

    /// Accepted field names, in schema order
    pub fn keys(&self) -> Vec<&str> {
        self.schema
            .fields()
            .map(|field| field.name())
            .filter(|name| self.accepted.contains_key(*name))
            .collect()
    }

    pub fn values(&self) -> Vec<&Native> {
        self.items().into_iter().map(|(_, value)| value).collect()
    }

    pub fn items(&self) -> Vec<(&str, &Native)> {
        self.schema
            .fields()
            .filter_map(|field| {
                self.accepted
                    .get_key_value(field.name())
                    .map(|(k, v)| (k.as_str(), v))
            })
            .collect()
    }

    /// Returns true if `name` holds an accepted value or names a computed
    /// member.
    pub fn contains(&self, name: &str) -> bool {
        self.accepted.contains_key(name) || self.schema.serializable(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn pending(&self) -> &NativeMap {
        &self.pending
    }

    pub fn accepted(&self) -> &NativeMap {
        &self.accepted
    }

    /// Builds a populated instance with mock values for `schema`.
    pub fn mock(schema: &Arc<Schema>, ctx: Option<&Context>, overrides: NativeMap) -> ModelResult<Self> {
        crate::mock::mock_model(schema, ctx, overrides)
    }
}

/// Original instance address to its copy, so shared and cyclic
/// sub-instances keep their shape in the copy.
type Copies = HashMap<usize, ModelRef>;

impl Model {
    fn copy_with(&self, copies: &mut Copies) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            pending: copy_map(&self.pending, copies),
            accepted: copy_map(&self.accepted, copies),
            strict: self.strict,
            clock: self.clock.clone(),
        }
    }

    fn emptied(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            pending: NativeMap::new(),
            accepted: NativeMap::new(),
            strict: self.strict,
            clock: self.clock.clone(),
        }
    }
}

fn copy_map(map: &NativeMap, copies: &mut Copies) -> NativeMap {
    map.iter()
        .map(|(key, value)| (key.clone(), copy_native(value, copies)))
        .collect()
}

fn copy_native(value: &Native, copies: &mut Copies) -> Native {
    match value {
        Native::Model(instance) => {
            if let Some(copy) = copies.get(&instance.address()) {
                return Native::Model(copy.clone());
            }
            let Ok(inner) = instance.try_borrow() else {
                // Mid-update; there is no consistent state to copy.
                return Native::Model(instance.clone());
            };
            // Registered before filling so that cycles resolve to the copy.
            let copy = ModelRef::new(inner.emptied());
            copies.insert(instance.address(), copy.clone());
            let filled = inner.copy_with(copies);
            *copy.borrow_mut() = filled;
            Native::Model(copy)
        }
        Native::List(items) => Native::List(items.iter().map(|item| copy_native(item, copies)).collect()),
        Native::Map(map) => Native::Map(copy_map(map, copies)),
        other => other.clone(),
    }
}

impl Clone for Model {
    fn clone(&self) -> Self {
        self.copy_with(&mut Copies::new())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self
            .schema
            .options()
            .repr_info
            .as_ref()
            .and_then(|info| info(self));
        match info {
            Some(info) => write!(f, "<{}: {}>", self.schema.name(), info),
            None => write!(f, "<{} instance>", self.schema.name()),
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.schema.name())
            .field("accepted", &self.accepted.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}
