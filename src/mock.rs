//! Mock instance generation
//!
//! Produces schema-valid sample data by asking each field kind for a mock
//! value. Generation is all-or-nothing: the first failing field aborts the
//! whole call, with the field name prefixed to the error.
//!
//! Recursion is bounded by the chain of schemas being mocked. A field whose
//! kind descends into a schema already on that chain is left out, so a
//! self-referential schema yields a finite result.

use std::sync::Arc;

use crate::config::ModelOptions;
use crate::context::Context;
use crate::errors::{MockError, ModelResult};
use crate::model::Model;
use crate::observability::{Event, Logger};
use crate::schema::Schema;
use crate::value::{Native, NativeMap};

/// Mock values for every field of `schema`, with `overrides` applied last.
pub fn mock(schema: &Schema, ctx: &Context, overrides: &NativeMap) -> Result<NativeMap, MockError> {
    let ctx = ctx.clone().with_visited(schema.id());
    let mut values = NativeMap::new();

    for field in schema.fields() {
        if overrides.contains_key(field.name()) {
            continue;
        }
        if let Some(sub) = field.kind().model_schema() {
            if ctx.has_visited(sub.id()) {
                continue;
            }
        }
        let value = field
            .kind()
            .mock(&ctx)
            .map_err(|err| err.within(field.name()))?;
        values.insert(field.name().to_string(), value);
    }

    values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(values)
}

/// Builds an instance of `schema` from mock values.
pub fn mock_model(schema: &Arc<Schema>, ctx: Option<&Context>, overrides: NativeMap) -> ModelResult<Model> {
    let ctx = ctx.cloned().unwrap_or_default();
    match mock(schema, &ctx, &overrides) {
        Ok(values) => {
            Logger::trace(
                Event::MockCreated,
                &[
                    ("fields", &values.len().to_string()),
                    ("schema", schema.name()),
                ],
            );
            Model::new(schema, Native::Map(values), ModelOptions::default())
        }
        Err(err) => {
            Logger::warn(
                Event::MockFailed,
                &[("error", &err.0), ("schema", schema.name())],
            );
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidateOptions;
    use crate::schema::{Declaration, Field};
    use crate::types::{IntType, StringType};

    #[test]
    fn test_mock_covers_every_field() {
        let schema = Declaration::new("Movie")
            .field("title", Field::new(StringType::new().max_length(40)).required())
            .field("year", Field::new(IntType::new().min_value(1950).max_value(2011)).required())
            .compile()
            .unwrap();

        let mut model = mock_model(&schema, None, NativeMap::new()).unwrap();
        assert!(model.validate(ValidateOptions::default()).is_ok());
        let year = model.get("year").unwrap().as_i64().unwrap();
        assert!((1950..=2011).contains(&year));
    }

    #[test]
    fn test_overrides_applied_last() {
        let schema = Declaration::new("Movie")
            .field("year", Field::new(IntType::new().min_value(1950).max_value(2011)))
            .compile()
            .unwrap();
        let mut overrides = NativeMap::new();
        overrides.insert("year".into(), Native::Int(1999));

        let values = mock(&schema, &Context::new(), &overrides).unwrap();
        assert_eq!(values["year"].as_i64(), Some(1999));
    }

    #[test]
    fn test_failure_names_the_field() {
        let schema = Declaration::new("Code")
            .field("code", Field::new(StringType::new().regex("^[A-Z]{3}$").unwrap()))
            .compile()
            .unwrap();

        let err = mock(&schema, &Context::new(), &NativeMap::new()).unwrap_err();
        assert!(err.0.starts_with("code: "));
    }
}
