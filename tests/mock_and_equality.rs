//! Mock and Equality Tests
//!
//! - Mocks are schema-valid and honor overrides
//! - Self- and mutually-referential schemas mock in finite depth
//! - Equality terminates over instance reference cycles
//! - Exports terminate over instance reference cycles
//! - Clones copy cyclic trees without sharing sub-instances

use schemata::config::{ExportOptions, ModelOptions, ValidateOptions};
use schemata::context::Context;
use schemata::errors::ModelError;
use schemata::schema::{Declaration, Field, Schema, SchemaLink};
use schemata::types::{IntType, ListType, ModelType, StringType};
use schemata::value::ModelRef;
use schemata::{Model, Native, NativeMap};
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

/// Node -> Node
fn linked_list() -> Arc<Schema> {
    let link = SchemaLink::deferred("Node");
    let node = Declaration::new("Node")
        .field("value", Field::new(IntType::new().min_value(0).max_value(9)))
        .field("next", Field::new(ModelType::linked(link.clone())))
        .field("children", Field::new(ListType::new(ModelType::linked(link.clone()))))
        .compile()
        .unwrap();
    link.bind(&node).unwrap();
    node
}

/// Author <-> Book. Returns both schemas; each keeps the other alive.
fn author_and_book() -> (Arc<Schema>, Arc<Schema>) {
    let author_link = SchemaLink::deferred("Author");
    let book = Declaration::new("Book")
        .field("title", Field::new(StringType::new().max_length(20)))
        .field("author", Field::new(ModelType::linked(author_link.clone())))
        .compile()
        .unwrap();
    let author = Declaration::new("Author")
        .field("name", Field::new(StringType::new().max_length(20)))
        .field("book", Field::new(ModelType::new(&book)))
        .compile()
        .unwrap();
    author_link.bind(&author).unwrap();
    (author, book)
}

/// Depth of nested sub-instances in a native value.
fn depth(value: &Native) -> usize {
    match value {
        Native::Model(model) => {
            let inner = model.borrow();
            1 + inner.accepted().values().chain(inner.pending().values()).map(depth).max().unwrap_or(0)
        }
        Native::List(items) => items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

// =============================================================================
// Mock Tests
// =============================================================================

#[test]
fn test_mock_is_valid() {
    let schema = Declaration::new("Movie")
        .field("title", Field::new(StringType::new().max_length(40)).required())
        .field("year", Field::new(IntType::new().min_value(1950).max_value(2011)).required())
        .compile()
        .unwrap();

    for _ in 0..20 {
        let mut model = Model::mock(&schema, None, NativeMap::new()).unwrap();
        assert!(model.validate(ValidateOptions::default()).is_ok());
    }
}

#[test]
fn test_mock_overrides_win() {
    let schema = linked_list();
    let mut overrides = NativeMap::new();
    overrides.insert("value".into(), Native::Int(7));

    let model = Model::mock(&schema, Some(&Context::new()), overrides).unwrap();
    assert_eq!(model.get("value").unwrap().as_i64(), Some(7));
}

/// The self-referential branch is omitted.
#[test]
fn test_self_reference_mock_is_finite() {
    let schema = linked_list();
    let model = Model::mock(&schema, None, NativeMap::new()).unwrap();

    assert!(model.pending().contains_key("value"));
    assert!(!model.pending().contains_key("next"));
    assert!(!model.pending().contains_key("children"));
}

/// Mutual references nest at most once per distinct schema.
#[test]
fn test_mutual_reference_mock_depth_is_bounded() {
    let (author, _book) = author_and_book();
    let model = Model::mock(&author, None, NativeMap::new()).unwrap();

    let book = model.get("book").unwrap();
    assert!(!book.as_model().unwrap().borrow().pending().contains_key("author"));

    let top = Native::Model(ModelRef::new(model));
    assert_eq!(depth(&top), 2);
}

#[test]
fn test_mock_failure_names_field_path() {
    let inner = Declaration::new("Inner")
        .field("code", Field::new(StringType::new().regex("^[0-9]+$").unwrap()))
        .compile()
        .unwrap();
    let outer = Declaration::new("Outer")
        .field("inner", Field::new(ModelType::new(&inner)))
        .compile()
        .unwrap();

    match Model::mock(&outer, None, NativeMap::new()) {
        Err(ModelError::MockCreation(err)) => assert!(err.0.starts_with("inner: code: ")),
        other => panic!("unexpected {:?}", other),
    }
}

// =============================================================================
// Equality Tests
// =============================================================================

fn cyclic_pair(author: &Arc<Schema>, book: &Arc<Schema>, title: &str) -> ModelRef {
    let a = ModelRef::new(Model::new(author, json!({"name": "Ann"}), ModelOptions::default()).unwrap());
    let b = ModelRef::new(Model::new(book, json!({"title": title}), ModelOptions::default()).unwrap());
    a.borrow_mut().set("book", b.clone()).unwrap();
    b.borrow_mut().set("author", a.clone()).unwrap();
    a.borrow_mut().validate(ValidateOptions::default()).unwrap();
    a
}

#[test]
fn test_equality_over_cycles_terminates() {
    let (author, book) = author_and_book();
    let first = cyclic_pair(&author, &book, "Dune");
    let second = cyclic_pair(&author, &book, "Dune");
    let third = cyclic_pair(&author, &book, "Emma");

    assert!(*first.borrow() == *second.borrow());
    assert!(*first.borrow() != *third.borrow());
    assert_eq!(Native::Model(first.clone()), Native::Model(second));
}

#[test]
fn test_instance_equals_itself() {
    let (author, book) = author_and_book();
    let first = cyclic_pair(&author, &book, "Dune");
    assert_eq!(Native::Model(first.clone()), Native::Model(first));
}

// =============================================================================
// Cyclic Export Tests
// =============================================================================

/// The back-reference to an instance already being exported becomes null.
#[test]
fn test_export_over_cycles_terminates() {
    let (author, book) = author_and_book();
    let first = cyclic_pair(&author, &book, "Dune");

    let out = first.borrow().to_primitive(&ExportOptions::default());
    assert_eq!(
        out,
        json!({"name": "Ann", "book": {"title": "Dune", "author": null}})
    );
}

/// A computed member leading back into the cycle becomes null as well.
#[test]
fn test_computed_member_over_cycles_terminates() {
    let author_link = SchemaLink::deferred("Author");
    let book = Declaration::new("Book")
        .field("title", Field::new(StringType::new()))
        .field("author", Field::new(ModelType::linked(author_link.clone())))
        .serializable("written_by", |model| model.get("author").unwrap_or(Native::Null))
        .compile()
        .unwrap();
    let author = Declaration::new("Author")
        .field("name", Field::new(StringType::new()))
        .field("book", Field::new(ModelType::new(&book)))
        .compile()
        .unwrap();
    author_link.bind(&author).unwrap();

    let first = cyclic_pair(&author, &book, "Dune");
    let out = first.borrow().to_primitive(&ExportOptions::default());
    assert_eq!(
        out,
        json!({"name": "Ann", "book": {"title": "Dune", "author": null, "written_by": null}})
    );
}

// =============================================================================
// Clone Tests
// =============================================================================

/// Cloning a cyclic tree terminates and yields an equal, unshared copy.
#[test]
fn test_clone_over_cycles() {
    let (author, book) = author_and_book();
    let first = cyclic_pair(&author, &book, "Dune");

    let copy = first.borrow().clone();
    assert!(copy == *first.borrow());

    let copied_book = copy.get("book").unwrap();
    let original_book = first.borrow().get("book").unwrap();
    assert!(!copied_book.as_model().unwrap().ptr_eq(original_book.as_model().unwrap()));

    copied_book.as_model().unwrap().borrow_mut().set("title", "Emma").unwrap();
    let title = original_book.as_model().unwrap().borrow().get("title").unwrap();
    assert_eq!(title.as_str(), Some("Dune"));
}
