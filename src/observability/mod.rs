//! Observability for schemata
//!
//! Structured, synchronous JSON logging of compilation, traversal and
//! mock events.
//!
//! # Usage
//!
//! ```ignore
//! use schemata::observability::{Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! Logger::trace(Event::SchemaCompiled, &[("schema", "Movie")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};
