//! String and boolean kinds

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;

use super::{describe, failures};
use crate::context::Context;
use crate::errors::{ErrorTree, MockError};
use crate::schema::FieldType;
use crate::value::Native;

/// Text with optional length bounds and pattern
#[derive(Debug, Clone, Default)]
pub struct StringType {
    min_length: Option<usize>,
    max_length: Option<usize>,
    regex: Option<Regex>,
}

impl StringType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Require values to match `pattern`.
    pub fn regex(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.regex = Some(Regex::new(pattern)?);
        Ok(self)
    }
}

impl FieldType for StringType {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn convert(&self, value: Native, _ctx: &Context) -> Result<Native, ErrorTree> {
        match value {
            Native::Str(_) => Ok(value),
            Native::Int(i) => Ok(Native::Str(i.to_string())),
            Native::Float(f) => Ok(Native::Str(f.to_string())),
            Native::Uuid(id) => Ok(Native::Str(id.hyphenated().to_string())),
            other => Err(ErrorTree::conversion(format!(
                "Couldn't interpret '{}' as string.",
                describe(&other)
            ))),
        }
    }

    fn validate(&self, value: &Native, _ctx: &Context) -> Result<(), ErrorTree> {
        let Some(text) = value.as_str() else {
            return Err(ErrorTree::validation(format!(
                "Couldn't interpret '{}' as string.",
                describe(value)
            )));
        };

        let mut messages = Vec::new();
        let length = text.chars().count();
        if self.min_length.map_or(false, |min| length < min) {
            messages.push("String value is too short.");
        }
        if self.max_length.map_or(false, |max| length > max) {
            messages.push("String value is too long.");
        }
        if let Some(regex) = &self.regex {
            if !regex.is_match(text) {
                messages.push("String value did not match validation regex.");
            }
        }

        failures(messages)
    }

    fn mock(&self, _ctx: &Context) -> Result<Native, MockError> {
        if self.regex.is_some() {
            return Err(MockError::new("cannot mock a value for a regex-constrained string"));
        }
        let low = self.min_length.unwrap_or(1);
        let high = self.max_length.unwrap_or(low + 20);
        if low > high {
            return Err(MockError::new("min_length exceeds max_length"));
        }
        let mut rng = rand::thread_rng();
        let length = rng.gen_range(low..=high);
        let text: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        Ok(Native::Str(text))
    }
}

/// True/false, also accepting the usual textual and numeric spellings
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolType;

impl BoolType {
    pub fn new() -> Self {
        Self
    }
}

const BOOL_ERROR: &str = "Must be either true or false.";

impl FieldType for BoolType {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn convert(&self, value: Native, _ctx: &Context) -> Result<Native, ErrorTree> {
        match &value {
            Native::Bool(b) => Ok(Native::Bool(*b)),
            Native::Int(0) => Ok(Native::Bool(false)),
            Native::Int(1) => Ok(Native::Bool(true)),
            Native::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Native::Bool(true)),
                "false" | "0" => Ok(Native::Bool(false)),
                _ => Err(ErrorTree::conversion(BOOL_ERROR)),
            },
            _ => Err(ErrorTree::conversion(BOOL_ERROR)),
        }
    }

    fn validate(&self, value: &Native, _ctx: &Context) -> Result<(), ErrorTree> {
        match value {
            Native::Bool(_) => Ok(()),
            _ => Err(ErrorTree::validation(BOOL_ERROR)),
        }
    }

    fn mock(&self, _ctx: &Context) -> Result<Native, MockError> {
        Ok(Native::Bool(rand::thread_rng().gen_bool(0.5)))
    }
}
