//! Model Lifecycle Tests
//!
//! - Partial acceptance on construction, enforcement on validate
//! - Exhaustive error collection
//! - Primitive round-trip
//! - Strict vs lenient input
//! - Custom field and instance validators
//! - Import into existing instances

use schemata::config::{ExportOptions, ModelOptions, ValidateOptions};
use schemata::context::FixedClock;
use schemata::errors::{ErrorKind, ErrorTree, ModelError};
use schemata::schema::{Declaration, Field, Schema, ValidatorError};
use schemata::types::{DateType, IntType, ModelType, StringType};
use schemata::{Model, Native};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn movie() -> Arc<Schema> {
    Declaration::new("Movie")
        .field("title", Field::new(StringType::new().max_length(40)).required())
        .field(
            "year",
            Field::new(IntType::new().min_value(1950).max_value(2011)).required(),
        )
        .compile()
        .unwrap()
}

fn data_error(err: ModelError) -> schemata::DataError {
    match err {
        ModelError::Data(errors) => errors,
        other => panic!("expected data error, got {:?}", other),
    }
}

// =============================================================================
// Partial Acceptance Tests
// =============================================================================

/// Construction with partial=true tolerates a missing required field;
/// validate(partial=false) afterward reports it.
#[test]
fn test_partial_then_full_validation() {
    let mut model = Model::new(&movie(), json!({"title": "Some Movie"}), ModelOptions::default())
        .expect("partial construction must succeed");

    let errors = data_error(model.validate(ValidateOptions::default()).unwrap_err());
    assert!(errors.field("year").unwrap().contains_kind(ErrorKind::Required));
    assert!(!errors.contains("title"));
}

/// Construction with partial=false enforces required fields immediately.
#[test]
fn test_validated_construction_enforces_required() {
    let err = Model::new(&movie(), json!({"title": "Some Movie"}), ModelOptions::validated())
        .unwrap_err();
    assert!(data_error(err).contains("year"));
}

// =============================================================================
// Exhaustive Error Tests
// =============================================================================

/// Two independently invalid fields are reported together.
#[test]
fn test_both_field_errors_reported() {
    let mut model = Model::new(
        &movie(),
        json!({"title": "x".repeat(41), "year": 1900}),
        ModelOptions::default(),
    )
    .unwrap();

    let errors = data_error(model.validate(ValidateOptions::default()).unwrap_err());
    assert_eq!(errors.len(), 2);
    assert!(errors.contains("title"));
    assert!(errors.contains("year"));
}

/// Conversion errors are collected across fields as well.
#[test]
fn test_conversion_errors_aggregate() {
    let schema = Declaration::new("Numbers")
        .field("a", Field::new(IntType::new()))
        .field("b", Field::new(IntType::new()))
        .compile()
        .unwrap();

    let err = Model::new(&schema, json!({"a": "x", "b": "y"}), ModelOptions::default()).unwrap_err();
    let errors = data_error(err);
    assert_eq!(errors.len(), 2);
    assert!(errors.contains_kind(ErrorKind::Conversion));
}

/// Errors serialize as field-keyed JSON.
#[test]
fn test_error_json_shape() {
    let mut model = Model::new(&movie(), json!({"year": 1900}), ModelOptions::default()).unwrap();
    let errors = data_error(model.validate(ValidateOptions::default()).unwrap_err());

    let value = errors.to_json();
    assert_eq!(value["title"][0]["kind"], "required");
    assert_eq!(
        value["year"][0]["message"],
        "Int value should be greater than or equal to 1950."
    );
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_primitive_round_trip() {
    let schema = movie();
    let mut original =
        Model::new(&schema, json!({"title": "Some Movie", "year": 2011}), ModelOptions::default()).unwrap();
    original.validate(ValidateOptions::default()).unwrap();
    let primitive = original.to_primitive(&ExportOptions::default());

    let mut copy = Model::new(&schema, primitive.clone(), ModelOptions::validated()).unwrap();
    assert_eq!(copy.to_primitive(&ExportOptions::default()), primitive);
    assert_eq!(copy.serialize(&ExportOptions::default()).unwrap(), primitive);
    assert_eq!(original, copy);
}

// =============================================================================
// Strict Mode Tests
// =============================================================================

#[test]
fn test_strict_rejects_unknown_key() {
    let err = Model::new(
        &movie(),
        json!({"title": "A", "director": "B"}),
        ModelOptions::default(),
    )
    .unwrap_err();

    let errors = data_error(err);
    let tree = errors.field("director").unwrap();
    assert!(tree.contains_kind(ErrorKind::Rogue));
    assert_eq!(tree.to_string(), "Rogue field");
}

#[test]
fn test_lenient_ignores_unknown_key() {
    let model = Model::new(
        &movie(),
        json!({"title": "A", "director": "B"}),
        ModelOptions::lenient(),
    )
    .unwrap();
    assert!(model.pending().get("director").is_none());
}

/// Aliases and serialized names count as known keys.
#[test]
fn test_alternate_keys_accepted_in_strict_mode() {
    let schema = Declaration::new("Person")
        .field("name", Field::new(StringType::new()).serialized_name("full_name"))
        .field("age", Field::new(IntType::new()))
        .compile()
        .unwrap();

    let model = Model::new(
        &schema,
        json!({"full_name": "Ann", "years": 30}),
        ModelOptions::default().with_alias("age", "years"),
    )
    .unwrap();
    assert_eq!(model.get("name").unwrap().as_str(), Some("Ann"));
    assert_eq!(model.get("age").unwrap().as_i64(), Some(30));
}

// =============================================================================
// Custom Validator Tests
// =============================================================================

fn ranged() -> Arc<Schema> {
    Declaration::new("Range")
        .field("low", Field::new(IntType::new()).required())
        .field("high", Field::new(IntType::new()).required())
        .validator("validate_high", |value, scope| {
            let low = scope.data.get("low").and_then(Native::as_i64);
            match (low, value.as_i64()) {
                (Some(low), Some(high)) if high < low => {
                    Err(ValidatorError::Field("high must not be below low".into()))
                }
                _ => Ok(()),
            }
        })
        .instance_validator("validate_span", |scope| {
            let low = scope.data.get("low").and_then(Native::as_i64).unwrap_or(0);
            let high = scope.data.get("high").and_then(Native::as_i64).unwrap_or(0);
            if high - low > 100 {
                Err("span too wide".into())
            } else {
                Ok(())
            }
        })
        .compile()
        .unwrap()
}

#[test]
fn test_field_validator_sees_earlier_fields() {
    let mut model = Model::new(&ranged(), json!({"low": 10, "high": 5}), ModelOptions::default()).unwrap();
    let errors = data_error(model.validate(ValidateOptions::default()).unwrap_err());
    assert_eq!(errors.field("high").unwrap().to_string(), "high must not be below low");
    assert!(errors.instance_errors().is_empty());
}

#[test]
fn test_instance_validator_runs_on_clean_fields() {
    let mut model = Model::new(&ranged(), json!({"low": 0, "high": 500}), ModelOptions::default()).unwrap();
    let errors = data_error(model.validate(ValidateOptions::default()).unwrap_err());
    assert_eq!(errors.instance_errors()[0].message, "span too wide");
    assert_eq!(errors.to_json()["__instance__"][0]["kind"], "instance");
}

fn always_failing(on_error: bool) -> Arc<Schema> {
    Declaration::new("Strict")
        .field("a", Field::new(IntType::new().max_value(10)))
        .instance_validator("validate_always", |_| Err("instance check failed".into()))
        .instance_validators_on_error(on_error)
        .compile()
        .unwrap()
}

/// Instance validators are skipped after field errors unless enabled.
#[test]
fn test_instance_validators_on_error_option() {
    let mut skipped = Model::new(&always_failing(false), json!({"a": 11}), ModelOptions::default()).unwrap();
    let errors = data_error(skipped.validate(ValidateOptions::default()).unwrap_err());
    assert!(errors.contains("a"));
    assert!(errors.instance_errors().is_empty());

    let mut eager = Model::new(&always_failing(true), json!({"a": 11}), ModelOptions::default()).unwrap();
    let errors = data_error(eager.validate(ValidateOptions::default()).unwrap_err());
    assert!(errors.contains("a"));
    assert_eq!(errors.instance_errors().len(), 1);
}

// =============================================================================
// Clock Tests
// =============================================================================

#[test]
fn test_injected_clock_drives_validation() {
    let schema = Declaration::new("Event")
        .field("on", Field::new(DateType::new().max_today()))
        .compile()
        .unwrap();
    let clock = Arc::new(FixedClock(NaiveDate::from_ymd_opt(2011, 5, 1).unwrap()));

    let mut past = Model::new(&schema, json!({"on": "2011-04-30"}), ModelOptions::default().with_clock(clock.clone())).unwrap();
    assert!(past.validate(ValidateOptions::default()).is_ok());

    let mut future = Model::new(&schema, json!({"on": "2011-05-02"}), ModelOptions::default().with_clock(clock)).unwrap();
    assert!(future.validate(ValidateOptions::default()).is_err());
}

// =============================================================================
// Import Tests
// =============================================================================

#[test]
fn test_import_merges_and_validates() {
    let mut model = Model::new(&movie(), json!({"title": "A"}), ModelOptions::default()).unwrap();
    model.import_data(json!({"year": "2000"}), false).unwrap();

    assert!(model.pending().is_empty());
    assert_eq!(model.get("year").unwrap().as_i64(), Some(2000));
    assert_eq!(model.keys(), vec!["title", "year"]);
}

#[test]
fn test_recursive_import_updates_nested_instance() {
    let person = Declaration::new("Person")
        .field("name", Field::new(StringType::new()))
        .field("age", Field::new(IntType::new()))
        .compile()
        .unwrap();
    let team = Declaration::new("Team")
        .field("lead", Field::new(ModelType::new(&person)))
        .compile()
        .unwrap();

    let mut model = Model::new(&team, json!({"lead": {"name": "Ann", "age": 30}}), ModelOptions::default()).unwrap();
    model.validate(ValidateOptions::default()).unwrap();
    let lead = model.get("lead").unwrap();

    model.import_data(json!({"lead": {"age": 31}}), true).unwrap();

    let after = model.get("lead").unwrap();
    let (before, after) = (lead.as_model().unwrap(), after.as_model().unwrap());
    assert!(before.ptr_eq(after));
    assert_eq!(after.borrow().get("name").unwrap().as_str(), Some("Ann"));
    assert_eq!(after.borrow().get("age").unwrap().as_i64(), Some(31));
}

#[test]
fn test_non_recursive_import_replaces_nested_instance() {
    let person = Declaration::new("Person")
        .field("name", Field::new(StringType::new()))
        .compile()
        .unwrap();
    let team = Declaration::new("Team")
        .field("lead", Field::new(ModelType::new(&person)))
        .compile()
        .unwrap();

    let mut model = Model::new(&team, json!({"lead": {"name": "Ann"}}), ModelOptions::default()).unwrap();
    model.import_data(json!({"lead": {}}), false).unwrap();

    let lead = model.get("lead").unwrap();
    assert!(matches!(lead.as_model().unwrap().borrow().get("name"), Err(ModelError::UndefinedValue { .. })));
}

#[test]
fn test_nested_conversion_errors_are_nested() {
    let person = Declaration::new("Person")
        .field("age", Field::new(IntType::new()))
        .compile()
        .unwrap();
    let team = Declaration::new("Team")
        .field("lead", Field::new(ModelType::new(&person)))
        .compile()
        .unwrap();

    let err = Model::new(&team, json!({"lead": {"age": "old"}}), ModelOptions::default()).unwrap_err();
    let errors = data_error(err);
    match errors.field("lead").unwrap() {
        ErrorTree::Nested(inner) => assert!(inner.contains("age")),
        other => panic!("unexpected {:?}", other),
    }
}

// =============================================================================
// All-or-Nothing Commit Tests
// =============================================================================

fn parent() -> Arc<Schema> {
    let child = Declaration::new("Child")
        .field("n", Field::new(IntType::new()))
        .compile()
        .unwrap();
    Declaration::new("Parent")
        .field("child", Field::new(ModelType::new(&child)))
        .field("year", Field::new(IntType::new().min_value(1950).max_value(2011)))
        .compile()
        .unwrap()
}

fn committed_parent() -> Model {
    Model::new(&parent(), json!({"child": {"n": 1}, "year": 2000}), ModelOptions::validated()).unwrap()
}

/// A failed parent validation leaves sub-instances uncommitted.
#[test]
fn test_failed_validation_keeps_nested_state() {
    let mut parent = committed_parent();
    let child = parent.get("child").unwrap();
    child.as_model().unwrap().borrow_mut().set("n", 7).unwrap();
    parent.set("year", 3000).unwrap();

    let errors = data_error(parent.validate(ValidateOptions::default()).unwrap_err());
    assert!(errors.contains("year"));

    {
        let child = child.as_model().unwrap().borrow();
        assert_eq!(child.accepted().get("n").and_then(Native::as_i64), Some(1));
        assert_eq!(child.pending().get("n").and_then(Native::as_i64), Some(7));
    }
    assert_eq!(
        parent.to_primitive(&ExportOptions::default()),
        json!({"child": {"n": 1}, "year": 2000})
    );
}

/// A recursive import that fails on the parent rolls back the sub-instance.
#[test]
fn test_failed_recursive_import_changes_nothing() {
    let mut parent = committed_parent();

    let err = parent
        .import_data(json!({"child": {"n": 5}, "year": 5000}), true)
        .unwrap_err();
    assert!(data_error(err).contains("year"));

    assert!(parent.pending().is_empty());
    assert_eq!(
        parent.to_primitive(&ExportOptions::default()),
        json!({"child": {"n": 1}, "year": 2000})
    );
}

/// A failing nested import keeps the parent's own fields out of pending.
#[test]
fn test_failed_nested_import_changes_nothing() {
    let mut parent = committed_parent();

    let err = parent
        .import_data(json!({"child": {"n": "many"}, "year": 2001}), true)
        .unwrap_err();
    let errors = data_error(err);
    assert!(matches!(errors.field("child"), Some(ErrorTree::Nested(_))));

    assert!(parent.pending().is_empty());
    assert_eq!(parent.get("year").unwrap().as_i64(), Some(2000));
    let child = parent.get("child").unwrap();
    assert!(child.as_model().unwrap().borrow().pending().is_empty());
}

/// Clones own their sub-instances.
#[test]
fn test_clone_is_independent() {
    let original = committed_parent();
    let mut copy = original.clone();

    copy.import_data(json!({"child": {"n": 99}}), true).unwrap();

    assert_eq!(original.to_primitive(&ExportOptions::default())["child"]["n"], 1);
    assert_eq!(copy.to_primitive(&ExportOptions::default())["child"]["n"], 99);
    assert!(!original
        .get("child")
        .unwrap()
        .as_model()
        .unwrap()
        .ptr_eq(copy.get("child").unwrap().as_model().unwrap()));
}

#[test]
fn test_huge_float_is_not_an_int() {
    let err = Model::new(&parent(), json!({"year": 1e30}), ModelOptions::default()).unwrap_err();
    assert!(data_error(err).field("year").unwrap().contains_kind(ErrorKind::Conversion));
}
