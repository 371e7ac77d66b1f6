//! Errors raised by traversal and instance access
//!
//! - `DataError` aggregates every field failure from one traversal call
//! - `ModelError` covers misuse (unknown fields, undefined values) and
//!   synthesis failures, which are raised immediately

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Key under which instance-level failures are reported in JSON output.
pub const INSTANCE_ERROR_KEY: &str = "__instance__";

/// Category of a single failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required field had no value
    Required,
    /// Raw value could not be coerced
    Conversion,
    /// Converted value failed a field or custom validator
    Validation,
    /// Input key not declared by the schema (strict mode)
    Rogue,
    /// Cross-field validator failed
    Instance,
}

/// A single leaf failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn required() -> Self {
        Self::new(ErrorKind::Required, "This field is required.")
    }

    pub fn rogue() -> Self {
        Self::new(ErrorKind::Rogue, "Rogue field")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Failures recorded for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorTree {
    /// Leaf failures for a scalar field
    Messages(Vec<FieldError>),
    /// Failures inside a sub-schema
    Nested(Box<DataError>),
    /// Failures keyed by list index
    Items(BTreeMap<usize, ErrorTree>),
}

impl ErrorTree {
    pub fn message(kind: ErrorKind, message: impl Into<String>) -> Self {
        ErrorTree::Messages(vec![FieldError::new(kind, message)])
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::message(ErrorKind::Conversion, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::message(ErrorKind::Validation, message)
    }

    pub fn required() -> Self {
        ErrorTree::Messages(vec![FieldError::required()])
    }

    pub fn rogue() -> Self {
        ErrorTree::Messages(vec![FieldError::rogue()])
    }

    /// Returns true if a failure of `kind` appears anywhere in the tree.
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        match self {
            ErrorTree::Messages(errors) => errors.iter().any(|e| e.kind == kind),
            ErrorTree::Nested(nested) => nested.contains_kind(kind),
            ErrorTree::Items(items) => items.values().any(|t| t.contains_kind(kind)),
        }
    }

    /// Combines two trees recorded for the same key.
    fn merge(self, other: ErrorTree) -> ErrorTree {
        match (self, other) {
            (ErrorTree::Messages(mut a), ErrorTree::Messages(b)) => {
                a.extend(b);
                ErrorTree::Messages(a)
            }
            (ErrorTree::Nested(mut a), ErrorTree::Nested(b)) => {
                a.absorb(*b);
                ErrorTree::Nested(a)
            }
            (ErrorTree::Items(mut a), ErrorTree::Items(b)) => {
                for (index, tree) in b {
                    let merged = match a.remove(&index) {
                        Some(existing) => existing.merge(tree),
                        None => tree,
                    };
                    a.insert(index, merged);
                }
                ErrorTree::Items(a)
            }
            (_, other) => other,
        }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorTree::Messages(errors) => {
                let joined: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                write!(f, "{}", joined.join(" "))
            }
            ErrorTree::Nested(nested) => write!(f, "{{{}}}", nested),
            ErrorTree::Items(items) => {
                let parts: Vec<String> =
                    items.iter().map(|(i, t)| format!("[{}]: {}", i, t)).collect();
                write!(f, "{}", parts.join("; "))
            }
        }
    }
}

/// Exhaustive collection of failures from one traversal.
///
/// An empty `DataError` means "no errors"; traversals only hand one back
/// when at least one failure was recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Error)]
#[error("{}", summarize(.fields, .instance))]
pub struct DataError {
    #[serde(flatten)]
    fields: BTreeMap<String, ErrorTree>,
    #[serde(rename = "__instance__", skip_serializing_if = "Vec::is_empty")]
    instance: Vec<FieldError>,
}

impl DataError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.instance.is_empty()
    }

    /// Number of failing fields plus instance-level failures
    pub fn len(&self) -> usize {
        self.fields.len() + self.instance.len()
    }

    /// Records failures for `field`, merging with anything already recorded.
    pub fn insert(&mut self, field: impl Into<String>, tree: ErrorTree) {
        let field = field.into();
        let merged = match self.fields.remove(&field) {
            Some(existing) => existing.merge(tree),
            None => tree,
        };
        self.fields.insert(field, merged);
    }

    /// Records an instance-level (cross-field) failure.
    pub fn push_instance(&mut self, message: impl Into<String>) {
        self.instance.push(FieldError::new(ErrorKind::Instance, message));
    }

    /// Moves every failure of `other` into `self`.
    pub fn absorb(&mut self, other: DataError) {
        for (field, tree) in other.fields {
            self.insert(field, tree);
        }
        self.instance.extend(other.instance);
    }

    pub fn field(&self, name: &str) -> Option<&ErrorTree> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ErrorTree)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn instance_errors(&self) -> &[FieldError] {
        &self.instance
    }

    /// Returns true if a failure of `kind` appears anywhere.
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.instance.iter().any(|e| e.kind == kind)
            || self.fields.values().any(|t| t.contains_kind(kind))
    }

    /// Converts into `Ok(())` when empty.
    pub fn into_result(self) -> Result<(), DataError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Renders the error set as JSON for transport.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// `field: message; ...` followed by instance-level messages.
fn summarize(fields: &BTreeMap<String, ErrorTree>, instance: &[FieldError]) -> String {
    fields
        .iter()
        .map(|(name, tree)| format!("{}: {}", name, tree))
        .chain(instance.iter().map(|e| e.message.clone()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure raised by a field kind while synthesizing a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MockError(pub String);

impl MockError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Prefixes the message with the failing field's name.
    pub fn within(self, field: &str) -> Self {
        Self(format!("{}: {}", field, self.0))
    }
}

/// Result type for instance operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Instance-level errors
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Invalid data: {0}")]
    Data(DataError),

    #[error("{schema} has no field '{field}'")]
    UnknownField { schema: String, field: String },

    #[error("{schema}.{field} has no value")]
    UndefinedValue { schema: String, field: String },

    #[error("Mock creation failed: {0}")]
    MockCreation(MockError),

    #[error("{schema} instance is already borrowed")]
    InstanceBusy { schema: String },
}

impl ModelError {
    pub fn unknown_field(schema: &str, field: &str) -> Self {
        Self::UnknownField {
            schema: schema.to_string(),
            field: field.to_string(),
        }
    }

    pub fn undefined_value(schema: &str, field: &str) -> Self {
        Self::UndefinedValue {
            schema: schema.to_string(),
            field: field.to_string(),
        }
    }

    /// Returns the aggregated data errors, if this is a data failure.
    pub fn data(&self) -> Option<&DataError> {
        match self {
            Self::Data(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<DataError> for ModelError {
    fn from(errors: DataError) -> Self {
        Self::Data(errors)
    }
}

impl From<MockError> for ModelError {
    fn from(error: MockError) -> Self {
        Self::MockCreation(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_error_means_no_errors() {
        let errors = DataError::new();
        assert!(errors.is_empty());
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_insert_merges_messages() {
        let mut errors = DataError::new();
        errors.insert("title", ErrorTree::conversion("bad"));
        errors.insert("title", ErrorTree::validation("worse"));

        assert_eq!(errors.len(), 1);
        match errors.field("title").unwrap() {
            ErrorTree::Messages(messages) => assert_eq!(messages.len(), 2),
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_nested_kind_lookup() {
        let mut inner = DataError::new();
        inner.insert("city", ErrorTree::required());
        let mut outer = DataError::new();
        outer.insert("address", ErrorTree::Nested(Box::new(inner)));

        assert!(outer.contains_kind(ErrorKind::Required));
        assert!(!outer.contains_kind(ErrorKind::Rogue));
    }

    #[test]
    fn test_json_shape() {
        let mut errors = DataError::new();
        errors.insert("year", ErrorTree::validation("too old"));
        errors.push_instance("dates out of order");

        let value = errors.to_json();
        assert_eq!(
            value["year"],
            json!([{"kind": "validation", "message": "too old"}])
        );
        assert_eq!(value[INSTANCE_ERROR_KEY][0]["kind"], "instance");
    }

    #[test]
    fn test_data_error_message() {
        let mut inner = DataError::new();
        inner.insert("n", ErrorTree::conversion("Value 'x' is not int."));
        let mut errors = DataError::new();
        errors.insert("child", ErrorTree::Nested(Box::new(inner)));
        errors.insert("year", ErrorTree::validation("too old"));
        errors.push_instance("dates out of order");

        assert_eq!(
            errors.to_string(),
            "child: {n: Value 'x' is not int.}; year: too old; dates out of order"
        );
        let source: &dyn std::error::Error = &errors;
        assert!(source.source().is_none());
    }

    #[test]
    fn test_mock_error_prefix() {
        let error = MockError::new("no pattern support").within("code");
        assert_eq!(error.to_string(), "code: no pattern support");
    }
}
