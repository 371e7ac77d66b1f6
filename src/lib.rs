//! schemata - declarative schemas for structured data
//!
//! Schemas are declared once, compiled into immutable field sets, and then
//! drive every operation on instance data: conversion, validation, export
//! and mock generation.

pub mod config;
pub mod context;
pub mod errors;
pub mod mock;
pub mod model;
pub mod observability;
pub mod schema;
pub mod transforms;
pub mod types;
pub mod value;

pub use config::{ExportOptions, ModelOptions, ValidateOptions};
pub use context::{Context, FixedClock, OutputShape, SystemClock};
pub use errors::{DataError, ErrorKind, ErrorTree, MockError, ModelError, ModelResult};
pub use model::Model;
pub use schema::{Declaration, ExportPolicy, Field, Role, Schema, SchemaError, SchemaLink};
pub use value::{Native, NativeMap};
