//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in schemata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Compilation
    /// A declaration compiled into a schema
    SchemaCompiled,
    /// A declaration was rejected
    SchemaCompileFailed,

    // Traversal
    /// Raw input converted into an instance
    ModelConverted,
    /// Raw input rejected during conversion
    ConversionFailed,
    /// Instance state accepted
    ValidationPassed,
    /// Instance state rejected
    ValidationFailed,

    // Synthesis
    /// Mock instance created
    MockCreated,
    /// Mock creation aborted
    MockFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaCompiled => "SCHEMA_COMPILED",
            Event::SchemaCompileFailed => "SCHEMA_COMPILE_FAILED",
            Event::ModelConverted => "MODEL_CONVERTED",
            Event::ConversionFailed => "CONVERSION_FAILED",
            Event::ValidationPassed => "VALIDATION_PASSED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::MockCreated => "MOCK_CREATED",
            Event::MockFailed => "MOCK_FAILED",
        }
    }

    /// Returns true if this event reports a rejection
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::SchemaCompileFailed
                | Event::ConversionFailed
                | Event::ValidationFailed
                | Event::MockFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
