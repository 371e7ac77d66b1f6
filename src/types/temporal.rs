//! Calendar date kind
//!
//! Dates travel as ISO-8601 `YYYY-MM-DD` strings and live as
//! `chrono::NaiveDate`. "Today" always comes from the context's clock.

use chrono::{Duration, NaiveDate};
use rand::Rng;

use super::{describe, failures};
use crate::context::Context;
use crate::errors::{ErrorTree, MockError};
use crate::schema::FieldType;
use crate::value::Native;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days spanned by mocks when a bound is missing
const MOCK_SPAN_DAYS: i64 = 3650;

/// Calendar date with optional inclusive bounds
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType {
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
    max_today: bool,
}

impl DateType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, date: NaiveDate) -> Self {
        self.min = Some(date);
        self
    }

    pub fn max(mut self, date: NaiveDate) -> Self {
        self.max = Some(date);
        self
    }

    /// Reject dates after the context clock's today.
    pub fn max_today(mut self) -> Self {
        self.max_today = true;
        self
    }

    fn upper_bound(&self, ctx: &Context) -> Option<NaiveDate> {
        if !self.max_today {
            return self.max;
        }
        let today = ctx.clock().today();
        Some(self.max.map_or(today, |max| max.min(today)))
    }
}

impl FieldType for DateType {
    fn type_name(&self) -> &'static str {
        "date"
    }

    fn convert(&self, value: Native, _ctx: &Context) -> Result<Native, ErrorTree> {
        match &value {
            Native::Date(date) => Ok(Native::Date(*date)),
            Native::Str(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map(Native::Date)
                .map_err(|_| {
                    ErrorTree::conversion(format!(
                        "Could not parse {}. Should be ISO 8601 (YYYY-MM-DD).",
                        s
                    ))
                }),
            other => Err(ErrorTree::conversion(format!(
                "Could not parse {}. Should be ISO 8601 (YYYY-MM-DD).",
                describe(other)
            ))),
        }
    }

    fn validate(&self, value: &Native, ctx: &Context) -> Result<(), ErrorTree> {
        let Native::Date(date) = value else {
            return Err(ErrorTree::validation(format!(
                "Value '{}' is not a date.",
                describe(value)
            )));
        };

        let mut messages = Vec::new();
        if let Some(min) = self.min.filter(|min| date < min) {
            messages.push(format!("Date should be on or after {}.", min.format(DATE_FORMAT)));
        }
        if let Some(max) = self.upper_bound(ctx).filter(|max| date > max) {
            messages.push(format!("Date should be on or before {}.", max.format(DATE_FORMAT)));
        }
        failures(messages)
    }

    fn mock(&self, ctx: &Context) -> Result<Native, MockError> {
        let span = Duration::days(MOCK_SPAN_DAYS);
        let (low, high) = match (self.min, self.upper_bound(ctx)) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, min + span),
            (None, Some(max)) => (max - span, max),
            (None, None) => {
                let today = ctx.clock().today();
                (today - span, today)
            }
        };
        if low > high {
            return Err(MockError::new("min date is after max date"));
        }
        let offset = rand::thread_rng().gen_range(0..=(high - low).num_days());
        Ok(Native::Date(low + Duration::days(offset)))
    }
}
