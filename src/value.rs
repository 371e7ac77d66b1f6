//! Native values
//!
//! `Native` is the trusted, in-memory form of field data. Primitive output
//! is a plain `serde_json::Value` tree; `Native::to_json` performs the final
//! flattening once an export pass has reduced rich values (dates, uuids,
//! sub-instances) to their primitive forms.

use std::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::context::{Context, OutputShape};
use crate::model::Model;
use crate::transforms::export_loop;

/// Field name to native value.
pub type NativeMap = BTreeMap<String, Native>;

/// A native field value.
#[derive(Debug, Clone)]
pub enum Native {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Uuid(Uuid),
    List(Vec<Native>),
    Map(NativeMap),
    /// A sub-instance bound to its own schema
    Model(ModelRef),
}

impl Native {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Native::Null => "null",
            Native::Bool(_) => "bool",
            Native::Int(_) => "int",
            Native::Float(_) => "float",
            Native::Str(_) => "string",
            Native::Date(_) => "date",
            Native::Uuid(_) => "uuid",
            Native::List(_) => "list",
            Native::Map(_) => "map",
            Native::Model(_) => "model",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Native::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Native::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Native::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Native::Float(f) => Some(*f),
            Native::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Native::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Native]> {
        match self {
            Native::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&NativeMap> {
        match self {
            Native::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelRef> {
        match self {
            Native::Model(model) => Some(model),
            _ => None,
        }
    }

    /// Consumes the value, returning the mapping it holds.
    pub fn into_map(self) -> Option<NativeMap> {
        match self {
            Native::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Reduces rich scalars to their primitive form, leaving the shape intact.
    pub fn to_primitive_native(&self) -> Native {
        self.to_primitive_in(&Context::export(OutputShape::Primitive))
    }

    /// Like `to_primitive_native`, inside an export traversal.
    ///
    /// Sub-instances export with `ctx`'s role; an instance already being
    /// exported further up becomes null.
    pub fn to_primitive_in(&self, ctx: &Context) -> Native {
        match self {
            Native::Date(date) => Native::Str(date.format("%Y-%m-%d").to_string()),
            Native::Uuid(id) => Native::Str(id.hyphenated().to_string()),
            Native::List(items) => {
                Native::List(items.iter().map(|item| item.to_primitive_in(ctx)).collect())
            }
            Native::Map(map) => Native::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_primitive_in(ctx)))
                    .collect(),
            ),
            Native::Model(model) => {
                if ctx.is_active(model.address()) {
                    return Native::Null;
                }
                match model.try_borrow() {
                    Ok(inner) => {
                        let child = ctx.descend(None, None).with_shape(OutputShape::Primitive);
                        Native::Map(export_loop(inner.schema(), &inner, &child))
                    }
                    Err(_) => Native::Null,
                }
            }
            other => other.clone(),
        }
    }

    /// Flattens the value into a JSON tree.
    pub fn to_json(&self) -> Value {
        match self {
            Native::Null => Value::Null,
            Native::Bool(b) => Value::Bool(*b),
            Native::Int(i) => Value::from(*i),
            Native::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Native::Str(s) => Value::String(s.clone()),
            Native::Date(_) | Native::Uuid(_) | Native::Model(_) => {
                self.to_primitive_native().to_json()
            }
            Native::List(items) => Value::Array(items.iter().map(Native::to_json).collect()),
            Native::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        crate::model::equality::natives_equal(self, other)
    }
}

impl From<Value> for Native {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Native::Null,
            Value::Bool(b) => Native::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Native::Int(i),
                None => Native::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Native::Str(s),
            Value::Array(items) => Native::List(items.into_iter().map(Native::from).collect()),
            Value::Object(map) => {
                Native::Map(map.into_iter().map(|(k, v)| (k, Native::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Native {
    fn from(value: &str) -> Self {
        Native::Str(value.to_string())
    }
}

impl From<String> for Native {
    fn from(value: String) -> Self {
        Native::Str(value)
    }
}

impl From<bool> for Native {
    fn from(value: bool) -> Self {
        Native::Bool(value)
    }
}

impl From<i64> for Native {
    fn from(value: i64) -> Self {
        Native::Int(value)
    }
}

impl From<i32> for Native {
    fn from(value: i32) -> Self {
        Native::Int(i64::from(value))
    }
}

impl From<f64> for Native {
    fn from(value: f64) -> Self {
        Native::Float(value)
    }
}

impl From<NaiveDate> for Native {
    fn from(value: NaiveDate) -> Self {
        Native::Date(value)
    }
}

impl From<Uuid> for Native {
    fn from(value: Uuid) -> Self {
        Native::Uuid(value)
    }
}

impl From<Vec<Native>> for Native {
    fn from(value: Vec<Native>) -> Self {
        Native::List(value)
    }
}

impl From<NativeMap> for Native {
    fn from(value: NativeMap) -> Self {
        Native::Map(value)
    }
}

impl From<Model> for Native {
    fn from(value: Model) -> Self {
        Native::Model(ModelRef::new(value))
    }
}

impl From<ModelRef> for Native {
    fn from(value: ModelRef) -> Self {
        Native::Model(value)
    }
}

/// Shared handle to a sub-instance.
///
/// Instances are single-threaded; the handle allows a parent to own a child
/// while callers keep a reference to it, and allows reference cycles between
/// instances.
#[derive(Clone)]
pub struct ModelRef(Rc<RefCell<Model>>);

impl ModelRef {
    pub fn new(model: Model) -> Self {
        Self(Rc::new(RefCell::new(model)))
    }

    /// Borrows the instance. Panics if it is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Model> {
        self.0.borrow()
    }

    /// Mutably borrows the instance. Panics if it is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Model> {
        self.0.borrow_mut()
    }

    pub fn try_borrow(&self) -> Result<Ref<'_, Model>, BorrowError> {
        self.0.try_borrow()
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, Model>, BorrowMutError> {
        self.0.try_borrow_mut()
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &ModelRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the instance, stable for its lifetime.
    pub(crate) fn address(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(model) => write!(f, "{}", model),
            Err(_) => write!(f, "<instance in use>"),
        }
    }
}
