//! Shared schema walk
//!
//! Walk semantics:
//! - Fields are visited in schema order
//! - Each field's value is resolved from, in order: per-call overrides,
//!   aliases and serialized names in the input, the field's own name in the
//!   input, trusted data, the declared default
//! - Every field is attempted; failures are collected, never short-circuited
//! - Instance validators run on the accumulated result
//!
//! The conversion and validation passes are the same walk with different
//! flags.

use crate::context::Context;
use crate::errors::{DataError, ErrorTree};
use crate::schema::{Field, Schema, ValidationScope, ValidatorError};
use crate::value::{Native, NativeMap};

/// Where a walk reads values from.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkSource<'a> {
    /// Values that win over everything else
    pub overrides: Option<&'a NativeMap>,
    /// Untrusted input
    pub data: Option<&'a NativeMap>,
    /// Previously accepted values
    pub trusted: Option<&'a NativeMap>,
}

impl<'a> WalkSource<'a> {
    pub fn new(data: &'a NativeMap) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn with_trusted(mut self, trusted: &'a NativeMap) -> Self {
        self.trusted = Some(trusted);
        self
    }

    pub fn with_overrides(mut self, overrides: &'a NativeMap) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// Result of one walk
#[derive(Debug)]
pub struct WalkOutcome {
    /// Fields that converted (and validated, if requested)
    pub data: NativeMap,
    /// Present only if at least one failure was recorded
    pub errors: Option<DataError>,
}

impl WalkOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_none()
    }

    pub fn into_result(self) -> Result<NativeMap, DataError> {
        match self.errors {
            Some(errors) => Err(errors),
            None => Ok(self.data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Input,
    Trusted,
    Default,
}

enum FieldFailure {
    Field(ErrorTree),
    Instance(String),
}

fn resolve(field: &Field, source: &WalkSource<'_>, ctx: &Context) -> Option<(Native, Origin)> {
    let name = field.name();

    if let Some(value) = source.overrides.and_then(|o| o.get(name)) {
        return Some((value.clone(), Origin::Input));
    }

    if let Some(data) = source.data {
        let alternates = ctx
            .aliases(name)
            .iter()
            .map(String::as_str)
            .chain(field.serialized_as());
        for key in alternates {
            if let Some(value) = data.get(key) {
                return Some((value.clone(), Origin::Input));
            }
        }
        if let Some(value) = data.get(name) {
            return Some((value.clone(), Origin::Input));
        }
    }

    if let Some(value) = source.trusted.and_then(|t| t.get(name)) {
        return Some((value.clone(), Origin::Trusted));
    }

    if ctx.apply_defaults() {
        if let Some(default) = field.default() {
            return Some((default.produce(), Origin::Default));
        }
    }

    None
}

fn process(
    schema: &Schema,
    field: &Field,
    value: Native,
    origin: Origin,
    accepted: &NativeMap,
    ctx: &Context,
) -> Result<Native, FieldFailure> {
    let mut value = value;

    // Defaults are declared in primitive form and always need conversion.
    if ctx.convert() || origin == Origin::Default {
        value = field
            .kind()
            .convert(value, ctx)
            .map_err(FieldFailure::Field)?;
    }

    if ctx.should_validate() {
        field
            .kind()
            .validate(&value, ctx)
            .map_err(FieldFailure::Field)?;

        if let Some(check) = schema.validator(field.name()) {
            let scope = ValidationScope {
                data: accepted,
                context: ctx,
            };
            check(&value, &scope).map_err(|err| match err {
                ValidatorError::Field(message) => {
                    FieldFailure::Field(ErrorTree::validation(message))
                }
                ValidatorError::Instance(message) => FieldFailure::Instance(message),
            })?;
        }
    }

    Ok(value)
}

/// Walks `schema` against `source`, converting and/or validating per `ctx`.
pub fn walk(schema: &Schema, source: &WalkSource<'_>, ctx: &Context) -> WalkOutcome {
    let mut data = NativeMap::new();
    let mut errors = DataError::new();

    if ctx.strict() {
        if let Some(raw) = source.data {
            for key in raw.keys() {
                if !schema.accepts_input_key(key, ctx) {
                    errors.insert(key.as_str(), ErrorTree::rogue());
                }
            }
        }
    }

    for field in schema.fields() {
        let enforce_required = field.is_required() && !ctx.partial();

        let Some((value, origin)) = resolve(field, source, ctx) else {
            if enforce_required {
                errors.insert(field.name(), ErrorTree::required());
            }
            continue;
        };

        if value.is_null() {
            if enforce_required {
                errors.insert(field.name(), ErrorTree::required());
            } else {
                data.insert(field.name().to_string(), Native::Null);
            }
            continue;
        }

        match process(schema, field, value, origin, &data, ctx) {
            Ok(value) => {
                data.insert(field.name().to_string(), value);
            }
            Err(FieldFailure::Field(tree)) => errors.insert(field.name(), tree),
            Err(FieldFailure::Instance(message)) => errors.push_instance(message),
        }
    }

    let run_instance_checks =
        errors.is_empty() || schema.options().instance_validators_on_error;
    if ctx.should_validate() && run_instance_checks {
        let scope = ValidationScope {
            data: &data,
            context: ctx,
        };
        for (_, check) in schema.instance_validators() {
            if let Err(message) = check(&scope) {
                errors.push_instance(message);
            }
        }
    }

    WalkOutcome {
        data,
        errors: if errors.is_empty() { None } else { Some(errors) },
    }
}

/// Conversion pass: coerce without validating.
pub fn convert(schema: &Schema, source: &WalkSource<'_>, ctx: &Context) -> WalkOutcome {
    let ctx = ctx.clone().with_convert(true).with_validate(false);
    walk(schema, source, &ctx)
}

/// Validation pass: validate, converting first unless `ctx` suppresses it.
pub fn validate(schema: &Schema, source: &WalkSource<'_>, ctx: &Context) -> WalkOutcome {
    let ctx = ctx.clone().with_validate(true);
    walk(schema, source, &ctx)
}
