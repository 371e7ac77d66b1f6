//! Numeric kinds

use rand::Rng;

use super::{describe, failures};
use crate::context::Context;
use crate::errors::{ErrorTree, MockError};
use crate::schema::FieldType;
use crate::value::Native;

/// Spread used for mocks when a bound is missing
const MOCK_SPAN: i64 = 100;

/// 2^63; integral floats must lie in `[-2^63, 2^63)` to fit an `i64`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn integral(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

/// Integer with optional inclusive bounds
#[derive(Debug, Clone, Copy, Default)]
pub struct IntType {
    min_value: Option<i64>,
    max_value: Option<i64>,
}

impl IntType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_value(mut self, value: i64) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn max_value(mut self, value: i64) -> Self {
        self.max_value = Some(value);
        self
    }
}

impl FieldType for IntType {
    fn type_name(&self) -> &'static str {
        "int"
    }

    fn convert(&self, value: Native, _ctx: &Context) -> Result<Native, ErrorTree> {
        let converted = match &value {
            Native::Int(i) => Some(*i),
            Native::Float(f) => integral(*f),
            Native::Str(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        converted
            .map(Native::Int)
            .ok_or_else(|| ErrorTree::conversion(format!("Value '{}' is not int.", describe(&value))))
    }

    fn validate(&self, value: &Native, _ctx: &Context) -> Result<(), ErrorTree> {
        let Native::Int(number) = value else {
            return Err(ErrorTree::validation(format!(
                "Value '{}' is not int.",
                describe(value)
            )));
        };

        let mut messages = Vec::new();
        if let Some(min) = self.min_value.filter(|min| number < min) {
            messages.push(format!("Int value should be greater than or equal to {}.", min));
        }
        if let Some(max) = self.max_value.filter(|max| number > max) {
            messages.push(format!("Int value should be less than or equal to {}.", max));
        }
        failures(messages)
    }

    fn mock(&self, _ctx: &Context) -> Result<Native, MockError> {
        let (low, high) = match (self.min_value, self.max_value) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, min.saturating_add(MOCK_SPAN)),
            (None, Some(max)) => (max.saturating_sub(MOCK_SPAN), max),
            (None, None) => (0, MOCK_SPAN),
        };
        if low > high {
            return Err(MockError::new("min_value exceeds max_value"));
        }
        Ok(Native::Int(rand::thread_rng().gen_range(low..=high)))
    }
}

/// Floating point number with optional inclusive bounds
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType {
    min_value: Option<f64>,
    max_value: Option<f64>,
}

impl FloatType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_value(mut self, value: f64) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn max_value(mut self, value: f64) -> Self {
        self.max_value = Some(value);
        self
    }
}

impl FieldType for FloatType {
    fn type_name(&self) -> &'static str {
        "float"
    }

    fn convert(&self, value: Native, _ctx: &Context) -> Result<Native, ErrorTree> {
        let converted = match &value {
            Native::Float(f) => Some(*f),
            Native::Int(i) => Some(*i as f64),
            Native::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        converted
            .map(Native::Float)
            .ok_or_else(|| ErrorTree::conversion(format!("Value '{}' is not float.", describe(&value))))
    }

    fn validate(&self, value: &Native, _ctx: &Context) -> Result<(), ErrorTree> {
        let Native::Float(number) = value else {
            return Err(ErrorTree::validation(format!(
                "Value '{}' is not float.",
                describe(value)
            )));
        };

        let mut messages = Vec::new();
        if let Some(min) = self.min_value.filter(|min| number < min) {
            messages.push(format!("Float value should be greater than or equal to {}.", min));
        }
        if let Some(max) = self.max_value.filter(|max| number > max) {
            messages.push(format!("Float value should be less than or equal to {}.", max));
        }
        failures(messages)
    }

    fn mock(&self, _ctx: &Context) -> Result<Native, MockError> {
        let span = MOCK_SPAN as f64;
        let (low, high) = match (self.min_value, self.max_value) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, min + span),
            (None, Some(max)) => (max - span, max),
            (None, None) => (0.0, span),
        };
        if !(low <= high) {
            return Err(MockError::new("min_value exceeds max_value"));
        }
        Ok(Native::Float(rand::thread_rng().gen_range(low..=high)))
    }
}
