//! Schema compilation errors
//!
//! Error codes:
//! - SCHEMATA_EMPTY_NAME
//! - SCHEMATA_DUPLICATE_FIELD
//! - SCHEMATA_DUPLICATE_ROLE
//! - SCHEMATA_UNKNOWN_ROLE_FIELD
//! - SCHEMATA_UNKNOWN_DEFAULT_ROLE
//! - SCHEMATA_DUPLICATE_VALIDATOR
//! - SCHEMATA_MALFORMED_VALIDATOR
//! - SCHEMATA_UNKNOWN_VALIDATOR_FIELD
//! - SCHEMATA_LINK_ALREADY_BOUND
//!
//! All of them are raised while compiling, before any instance exists.

use std::fmt;

/// Compilation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Declaration or field with an empty name
    EmptyName,
    /// Same field declared twice in one declaration
    DuplicateField,
    /// Same role declared twice in one declaration
    DuplicateRole,
    /// Role names a field the schema does not have
    UnknownRoleField,
    /// Default role is not a declared role
    UnknownDefaultRole,
    /// Same validator declared twice in one declaration
    DuplicateValidator,
    /// Validator name does not follow `validate_<field>`
    MalformedValidator,
    /// Validator targets a field the schema does not have
    UnknownValidatorField,
    /// Deferred link bound to a second schema
    LinkAlreadyBound,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::EmptyName => "SCHEMATA_EMPTY_NAME",
            SchemaErrorCode::DuplicateField => "SCHEMATA_DUPLICATE_FIELD",
            SchemaErrorCode::DuplicateRole => "SCHEMATA_DUPLICATE_ROLE",
            SchemaErrorCode::UnknownRoleField => "SCHEMATA_UNKNOWN_ROLE_FIELD",
            SchemaErrorCode::UnknownDefaultRole => "SCHEMATA_UNKNOWN_DEFAULT_ROLE",
            SchemaErrorCode::DuplicateValidator => "SCHEMATA_DUPLICATE_VALIDATOR",
            SchemaErrorCode::MalformedValidator => "SCHEMATA_MALFORMED_VALIDATOR",
            SchemaErrorCode::UnknownValidatorField => "SCHEMATA_UNKNOWN_VALIDATOR_FIELD",
            SchemaErrorCode::LinkAlreadyBound => "SCHEMATA_LINK_ALREADY_BOUND",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    schema: Option<String>,
}

impl SchemaError {
    fn new(code: SchemaErrorCode, schema: Option<&str>, message: String) -> Self {
        Self {
            code,
            message,
            schema: schema.map(str::to_string),
        }
    }

    pub fn empty_name(schema: &str, what: &str) -> Self {
        Self::new(
            SchemaErrorCode::EmptyName,
            Some(schema),
            format!("{} name must not be empty", what),
        )
    }

    pub fn duplicate_field(schema: &str, field: &str) -> Self {
        Self::new(
            SchemaErrorCode::DuplicateField,
            Some(schema),
            format!("Field '{}' is declared more than once", field),
        )
    }

    pub fn duplicate_role(schema: &str, role: &str) -> Self {
        Self::new(
            SchemaErrorCode::DuplicateRole,
            Some(schema),
            format!("Role '{}' is declared more than once", role),
        )
    }

    pub fn unknown_role_field(schema: &str, role: &str, field: &str) -> Self {
        Self::new(
            SchemaErrorCode::UnknownRoleField,
            Some(schema),
            format!("Role '{}' names unknown field '{}'", role, field),
        )
    }

    pub fn unknown_default_role(schema: &str, role: &str) -> Self {
        Self::new(
            SchemaErrorCode::UnknownDefaultRole,
            Some(schema),
            format!("Default role '{}' is not declared", role),
        )
    }

    pub fn duplicate_validator(schema: &str, name: &str) -> Self {
        Self::new(
            SchemaErrorCode::DuplicateValidator,
            Some(schema),
            format!("Validator '{}' is declared more than once", name),
        )
    }

    pub fn malformed_validator(schema: &str, name: &str) -> Self {
        Self::new(
            SchemaErrorCode::MalformedValidator,
            Some(schema),
            format!("Validator '{}' must be named 'validate_<field>'", name),
        )
    }

    pub fn unknown_validator_field(schema: &str, name: &str, field: &str) -> Self {
        Self::new(
            SchemaErrorCode::UnknownValidatorField,
            Some(schema),
            format!("Validator '{}' targets unknown field '{}'", name, field),
        )
    }

    pub fn link_already_bound(link: &str) -> Self {
        Self::new(
            SchemaErrorCode::LinkAlreadyBound,
            None,
            format!("Schema link '{}' is already bound", link),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the declaration name if applicable
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.code.code())?;
        if let Some(schema) = &self.schema {
            write!(f, "[{}] ", schema)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
