//! Structured JSON logger
//!
//! Every record is one JSON object on one line, keys in alphabetical order.
//! Records below the process-wide minimum severity are dropped; a library
//! should stay quiet unless asked.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::{Map, Value};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-call detail (compilations, traversals)
    Trace = 0,
    /// Rejected data, failed mocks
    Warn = 1,
    /// Broken declarations
    Error = 2,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Severity::Trace,
            1 => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Warn as u8);

/// Process-wide structured logger
pub struct Logger;

impl Logger {
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Returns true if a record at `severity` would be written.
    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Writes one record. Errors go to stderr, everything else to stdout.
    pub fn log(severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = record(severity, event, fields);
        match severity {
            Severity::Error => emit(&mut io::stderr(), &line),
            _ => emit(&mut io::stdout(), &line),
        }
    }

    pub fn trace(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn warn(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: Event, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Renders a record. `event` and `severity` cannot be shadowed by fields.
fn record(severity: Severity, event: Event, fields: &[(&str, &str)]) -> String {
    let mut object: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect();
    object.insert("event".to_string(), Value::from(event.as_str()));
    object.insert("severity".to_string(), Value::from(severity.as_str()));
    Value::Object(object).to_string()
}

fn emit<W: Write>(writer: &mut W, line: &str) {
    // A failed log write must never fail the traversal that logged.
    let _ = writeln!(writer, "{}", line);
    let _ = writer.flush();
}
