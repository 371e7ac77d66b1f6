//! Schema Compilation Tests
//!
//! - Field order is stable across inheritance
//! - Overriding fields keep their original slot
//! - Malformed declarations are rejected before any instance exists

use schemata::schema::{Declaration, Field, Role, SchemaErrorCode, ValidatorError};
use schemata::types::{IntType, StringType};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn base() -> Arc<schemata::Schema> {
    Declaration::new("Base")
        .field("id", Field::new(IntType::new()))
        .field("title", Field::new(StringType::new()))
        .compile()
        .unwrap()
}

// =============================================================================
// Field Order Tests
// =============================================================================

/// Base [id, title] + child [title (override), year] => [id, title, year].
#[test]
fn test_override_keeps_slot() {
    let child = Declaration::new("Child")
        .extends(&base())
        .field("title", Field::new(StringType::new().max_length(40)).required())
        .field("year", Field::new(IntType::new()))
        .compile()
        .unwrap();

    assert_eq!(child.field_names(), vec!["id", "title", "year"]);
    assert!(child.field("title").unwrap().is_required());
}

/// Compiling the same declaration twice yields the same order.
#[test]
fn test_order_is_deterministic() {
    for _ in 0..10 {
        let schema = Declaration::new("Wide")
            .field("z", Field::new(IntType::new()))
            .field("a", Field::new(IntType::new()))
            .field("m", Field::new(IntType::new()))
            .compile()
            .unwrap();
        assert_eq!(schema.field_names(), vec!["z", "a", "m"]);
    }
}

/// Later parents override earlier ones in place.
#[test]
fn test_multiple_parents_merge_in_order() {
    let first = Declaration::new("First")
        .field("a", Field::new(IntType::new()))
        .field("b", Field::new(IntType::new()))
        .compile()
        .unwrap();
    let second = Declaration::new("Second")
        .field("b", Field::new(StringType::new()))
        .field("c", Field::new(IntType::new()))
        .compile()
        .unwrap();

    let merged = Declaration::new("Merged")
        .extends(&first)
        .extends(&second)
        .compile()
        .unwrap();

    assert_eq!(merged.field_names(), vec!["a", "b", "c"]);
    assert_eq!(merged.field("b").unwrap().kind().type_name(), "string");
}

/// Roles and validators are inherited.
#[test]
fn test_roles_and_validators_inherited() {
    let parent = Declaration::new("Parent")
        .field("a", Field::new(IntType::new()))
        .field("b", Field::new(IntType::new()))
        .validator("validate_a", |_, _| Err(ValidatorError::Field("no".into())))
        .role("public", Role::whitelist(["a"]))
        .compile()
        .unwrap();

    let child = Declaration::new("Child").extends(&parent).compile().unwrap();
    assert!(child.validator("a").is_some());
    assert!(child.role("public").is_some());
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_duplicate_field_rejected() {
    let err = Declaration::new("Dup")
        .field("a", Field::new(IntType::new()))
        .field("a", Field::new(IntType::new()))
        .compile()
        .unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::DuplicateField);
}

#[test]
fn test_role_naming_unknown_field_rejected() {
    let err = Declaration::new("Roles")
        .field("a", Field::new(IntType::new()))
        .role("public", Role::whitelist(["missing"]))
        .compile()
        .unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::UnknownRoleField);
}

#[test]
fn test_validator_without_prefix_rejected() {
    let err = Declaration::new("Checks")
        .field("a", Field::new(IntType::new()))
        .validator("check_a", |_, _| Ok(()))
        .compile()
        .unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::MalformedValidator);
}

#[test]
fn test_validator_for_unknown_field_rejected() {
    let err = Declaration::new("Checks")
        .field("a", Field::new(IntType::new()))
        .validator("validate_b", |_, _| Ok(()))
        .compile()
        .unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::UnknownValidatorField);
}

#[test]
fn test_unknown_default_role_rejected() {
    let err = Declaration::new("Roles")
        .field("a", Field::new(IntType::new()))
        .default_role("ghost")
        .compile()
        .unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::UnknownDefaultRole);
}
