//! Compound kinds: lists and nested schemas
//!
//! Both recurse into the traversal engine instead of handling a single
//! scalar. Nested schemas derive a child context on the way down, so
//! partial/strict overrides and role resolution apply per sub-schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;

use super::{describe, failures};
use crate::context::Context;
use crate::errors::{ErrorTree, MockError, ModelError};
use crate::model::Model;
use crate::schema::{FieldType, Schema, SchemaLink};
use crate::transforms::export_loop;
use crate::value::{ModelRef, Native, NativeMap};

/// Sequence of values of a single kind
#[derive(Debug, Clone)]
pub struct ListType {
    item: Arc<dyn FieldType>,
    min_size: Option<usize>,
    max_size: Option<usize>,
}

impl ListType {
    pub fn new(item: impl FieldType + 'static) -> Self {
        Self {
            item: Arc::new(item),
            min_size: None,
            max_size: None,
        }
    }

    pub fn min_size(mut self, size: usize) -> Self {
        self.min_size = Some(size);
        self
    }

    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn item(&self) -> &dyn FieldType {
        self.item.as_ref()
    }
}

impl FieldType for ListType {
    fn type_name(&self) -> &'static str {
        "list"
    }

    fn convert(&self, value: Native, ctx: &Context) -> Result<Native, ErrorTree> {
        let items = match value {
            Native::List(items) => items,
            // A lone string or mapping is a one-element list.
            single @ (Native::Str(_) | Native::Map(_)) => vec![single],
            other => {
                return Err(ErrorTree::conversion(format!(
                    "Could not interpret '{}' as a list.",
                    describe(&other)
                )))
            }
        };

        let mut converted = Vec::with_capacity(items.len());
        let mut errors = BTreeMap::new();
        for (index, item) in items.into_iter().enumerate() {
            match self.item.convert(item, ctx) {
                Ok(value) => converted.push(value),
                Err(tree) => {
                    errors.insert(index, tree);
                }
            }
        }

        if errors.is_empty() {
            Ok(Native::List(converted))
        } else {
            Err(ErrorTree::Items(errors))
        }
    }

    fn validate(&self, value: &Native, ctx: &Context) -> Result<(), ErrorTree> {
        let Some(items) = value.as_list() else {
            return Err(ErrorTree::validation(format!(
                "Could not interpret '{}' as a list.",
                describe(value)
            )));
        };

        let mut messages = Vec::new();
        if let Some(min) = self.min_size.filter(|min| items.len() < *min) {
            messages.push(format!("Please provide at least {} item(s).", min));
        }
        if let Some(max) = self.max_size.filter(|max| items.len() > *max) {
            messages.push(format!("Please provide no more than {} item(s).", max));
        }
        failures(messages)?;

        let errors: BTreeMap<usize, ErrorTree> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| self.item.validate(item, ctx).err().map(|e| (index, e)))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ErrorTree::Items(errors))
        }
    }

    fn export(&self, value: &Native, ctx: &Context) -> Native {
        match value {
            Native::List(items) => Native::List(
                items
                    .iter()
                    .map(|item| match item {
                        Native::Null => Native::Null,
                        item => self.item.export(item, ctx),
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn mock(&self, ctx: &Context) -> Result<Native, MockError> {
        let low = self.min_size.unwrap_or(1);
        let high = self.max_size.unwrap_or(low.max(1) + 2);
        if low > high {
            return Err(MockError::new("min_size exceeds max_size"));
        }
        let count = rand::thread_rng().gen_range(low..=high);
        let items = (0..count)
            .map(|_| self.item.mock(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Native::List(items))
    }

    fn model_schema(&self) -> Option<Arc<Schema>> {
        self.item.model_schema()
    }

    fn is_compound(&self) -> bool {
        true
    }
}

/// Nested instance of another (or the same) schema
#[derive(Debug, Clone)]
pub struct ModelType {
    link: SchemaLink,
    partial: Option<bool>,
    strict: Option<bool>,
}

impl ModelType {
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self::linked(SchemaLink::to(schema))
    }

    /// Nested schema reached through a link, possibly bound later.
    pub fn linked(link: SchemaLink) -> Self {
        Self {
            link,
            partial: None,
            strict: None,
        }
    }

    /// Override the enclosing traversal's partial flag for this sub-schema.
    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = Some(partial);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    fn target(&self) -> Option<Arc<Schema>> {
        self.link.resolve()
    }

    fn unbound(&self) -> String {
        format!("Schema {} is not bound.", self.link.name())
    }

    fn child(&self, ctx: &Context) -> Context {
        ctx.descend(self.partial, self.strict)
    }
}

impl FieldType for ModelType {
    fn type_name(&self) -> &'static str {
        "model"
    }

    fn convert(&self, value: Native, ctx: &Context) -> Result<Native, ErrorTree> {
        let schema = self
            .target()
            .ok_or_else(|| ErrorTree::conversion(self.unbound()))?;

        match value {
            Native::Model(instance) => {
                let same = match instance.try_borrow() {
                    Ok(inner) => inner.schema().id() == schema.id(),
                    // Mutably borrowed means it is being processed further up.
                    Err(_) => true,
                };
                if same {
                    Ok(Native::Model(instance))
                } else {
                    Err(ErrorTree::conversion(format!(
                        "Please use a mapping for this field or {} instance instead of {}.",
                        schema.name(),
                        describe(&Native::Model(instance))
                    )))
                }
            }
            Native::Map(raw) => Model::from_context(&schema, &raw, &self.child(ctx))
                .map(|model| Native::Model(ModelRef::new(model)))
                .map_err(|errors| ErrorTree::Nested(Box::new(errors))),
            other => Err(ErrorTree::conversion(format!(
                "Please use a mapping for this field or {} instance instead of {}.",
                schema.name(),
                describe(&other)
            ))),
        }
    }

    fn validate(&self, value: &Native, ctx: &Context) -> Result<(), ErrorTree> {
        let Some(instance) = value.as_model() else {
            return Err(ErrorTree::validation(format!(
                "Expected a {} instance.",
                self.link.name()
            )));
        };
        // Already borrowed: validation of this instance is in progress up
        // the call chain.
        let Ok(mut inner) = instance.try_borrow_mut() else {
            return Ok(());
        };
        match inner.validate_with(&self.child(ctx)) {
            Ok(()) => Ok(()),
            Err(ModelError::Data(errors)) => Err(ErrorTree::Nested(Box::new(errors))),
            Err(other) => Err(ErrorTree::validation(other.to_string())),
        }
    }

    fn export(&self, value: &Native, ctx: &Context) -> Native {
        let Some(instance) = value.as_model() else {
            return value.clone();
        };
        if ctx.is_active(instance.address()) {
            return Native::Null;
        }
        match instance.try_borrow() {
            Ok(inner) => Native::Map(export_loop(inner.schema(), &inner, &self.child(ctx))),
            Err(_) => Native::Null,
        }
    }

    fn mock(&self, ctx: &Context) -> Result<Native, MockError> {
        let schema = self.target().ok_or_else(|| MockError::new(self.unbound()))?;
        match crate::mock::mock_model(&schema, Some(ctx), NativeMap::new()) {
            Ok(model) => Ok(Native::Model(ModelRef::new(model))),
            Err(ModelError::MockCreation(err)) => Err(err),
            Err(other) => Err(MockError::new(other.to_string())),
        }
    }

    fn model_schema(&self) -> Option<Arc<Schema>> {
        self.target()
    }

    fn is_compound(&self) -> bool {
        true
    }
}
