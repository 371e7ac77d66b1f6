//! Export traversal
//!
//! Projects an instance into a map in schema order. Role filtering decides
//! which members appear; the context's shape decides their form.

use crate::config::ExportOptions;
use crate::context::{Context, OutputShape};
use crate::model::Model;
use crate::schema::{ExportPolicy, Field, Schema};
use crate::value::{Native, NativeMap};

use super::roles::RoleFilter;

/// Replaces the export of scalar fields.
///
/// Compound fields (lists, sub-models) always export through their own
/// traversal; the converter sees their scalar members instead.
pub trait FieldConverter: Send + Sync {
    fn convert(&self, field: &Field, value: &Native, ctx: &Context) -> Native;
}

impl<F> FieldConverter for F
where
    F: Fn(&Field, &Native, &Context) -> Native + Send + Sync,
{
    fn convert(&self, field: &Field, value: &Native, ctx: &Context) -> Native {
        self(field, value, ctx)
    }
}

/// Identity of an instance for the duration of one traversal.
pub(crate) fn model_address(model: &Model) -> usize {
    model as *const Model as usize
}

/// Exports `model` against `schema` in the context's shape and role.
///
/// Absent fields are skipped. Null values appear only when the schema
/// serializes nulls. Computed members follow the fields.
pub fn export_loop(schema: &Schema, model: &Model, ctx: &Context) -> NativeMap {
    let ctx = ctx.clone().with_active(model_address(model));
    let filter = RoleFilter::resolve(schema, ctx.role());
    let keep_null = schema.options().serialize_when_none;
    let mut out = NativeMap::new();

    for field in schema.fields() {
        if !filter.includes(field.name(), field.policy()) {
            continue;
        }
        let Some(value) = model
            .accepted()
            .get(field.name())
            .or_else(|| model.pending().get(field.name()))
        else {
            continue;
        };

        let exported = if value.is_null() {
            Native::Null
        } else {
            match ctx.field_converter() {
                Some(converter) if !field.kind().is_compound() => {
                    converter.convert(field, value, &ctx)
                }
                _ => field.kind().export(value, &ctx),
            }
        };

        if exported.is_null() && !keep_null {
            continue;
        }
        out.insert(field.output_key().to_string(), exported);
    }

    for (name, compute) in schema.serializables() {
        if !filter.includes(name, ExportPolicy::Default) {
            continue;
        }
        let value = compute(model);
        let exported = match ctx.shape() {
            OutputShape::Native => value,
            OutputShape::Primitive => value.to_primitive_in(&ctx),
        };
        if exported.is_null() && !keep_null {
            continue;
        }
        out.insert(name.to_string(), exported);
    }

    out
}

/// Native-shape export
pub fn to_native(model: &Model, options: &ExportOptions) -> NativeMap {
    let ctx = options.context().with_shape(OutputShape::Native);
    export_loop(model.schema(), model, &ctx)
}

/// Primitive-shape export, as JSON
pub fn to_primitive(model: &Model, options: &ExportOptions) -> serde_json::Value {
    let ctx = options.context().with_shape(OutputShape::Primitive);
    Native::Map(export_loop(model.schema(), model, &ctx)).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelOptions;
    use crate::schema::{Declaration, Role};
    use crate::types::{DateType, IntType, StringType};
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Declaration::new("Record")
            .field("a", Field::new(IntType::new()))
            .field("b", Field::new(StringType::new()).serialized_name("bee"))
            .field("when", Field::new(DateType::new()))
            .role("public", Role::whitelist(["a"]))
            .compile()
            .unwrap()
    }

    #[test]
    fn test_primitive_export_formats_dates() {
        let schema = schema();
        let model = Model::new(
            &schema,
            json!({"a": 1, "b": "x", "when": "2011-01-02"}),
            ModelOptions::default(),
        )
        .unwrap();

        let out = to_primitive(&model, &ExportOptions::default());
        assert_eq!(out, json!({"a": 1, "bee": "x", "when": "2011-01-02"}));
    }

    #[test]
    fn test_role_filters_fields() {
        let schema = schema();
        let model = Model::new(&schema, json!({"a": 1, "b": "x"}), ModelOptions::default()).unwrap();

        let out = to_primitive(&model, &ExportOptions::default().with_role("public"));
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn test_absent_fields_are_skipped() {
        let schema = schema();
        let model = Model::new(&schema, json!({"a": 1}), ModelOptions::default()).unwrap();

        let out = to_native(&model, &ExportOptions::default());
        assert_eq!(out.len(), 1);
        assert!(out.contains_key("a"));
    }

    #[test]
    fn test_field_converter_replaces_scalar_export() {
        let schema = schema();
        let model = Model::new(&schema, json!({"a": 1, "b": "x"}), ModelOptions::default()).unwrap();
        let converter: Arc<dyn FieldConverter> =
            Arc::new(|field: &Field, _: &Native, _: &Context| Native::from(field.name()));

        let out = to_primitive(&model, &ExportOptions::default().with_field_converter(converter));
        assert_eq!(out, json!({"a": "a", "bee": "b"}));
    }
}
