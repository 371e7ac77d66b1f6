//! Structural equality
//!
//! Two instances are equal when they share a schema and their accepted data
//! matches field by field. Each top-level comparison carries a memo of
//! instance pairs under comparison; meeting a pair again counts as equal,
//! which terminates comparisons over reference cycles.

use std::collections::HashSet;

use crate::transforms::model_address;
use crate::value::{ModelRef, Native, NativeMap};

use super::instance::Model;

type Memo = HashSet<(usize, usize)>;

/// Compares two native values, recursing into sub-instances.
pub fn natives_equal(left: &Native, right: &Native) -> bool {
    let mut memo = Memo::new();
    native_eq(left, right, &mut memo)
}

/// Compares two instances.
pub fn models_equal(left: &Model, right: &Model) -> bool {
    let mut memo = Memo::new();
    model_pair_eq(left, model_address(left), right, model_address(right), &mut memo)
}

fn native_eq(left: &Native, right: &Native, memo: &mut Memo) -> bool {
    match (left, right) {
        (Native::Null, Native::Null) => true,
        (Native::Bool(a), Native::Bool(b)) => a == b,
        (Native::Int(a), Native::Int(b)) => a == b,
        (Native::Float(a), Native::Float(b)) => a == b,
        (Native::Int(a), Native::Float(b)) | (Native::Float(b), Native::Int(a)) => *a as f64 == *b,
        (Native::Str(a), Native::Str(b)) => a == b,
        (Native::Date(a), Native::Date(b)) => a == b,
        (Native::Uuid(a), Native::Uuid(b)) => a == b,
        (Native::List(a), Native::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| native_eq(x, y, memo))
        }
        (Native::Map(a), Native::Map(b)) => maps_eq(a, b, memo),
        (Native::Model(a), Native::Model(b)) => refs_eq(a, b, memo),
        _ => false,
    }
}

fn maps_eq(left: &NativeMap, right: &NativeMap, memo: &mut Memo) -> bool {
    left.len() == right.len()
        && left.iter().all(|(key, value)| {
            right
                .get(key)
                .map_or(false, |other| native_eq(value, other, memo))
        })
}

fn refs_eq(left: &ModelRef, right: &ModelRef, memo: &mut Memo) -> bool {
    if left.ptr_eq(right) {
        return true;
    }
    let key = (left.address(), right.address());
    if memo.contains(&key) {
        return true;
    }
    // A mutably borrowed instance is mid-update and cannot be compared.
    let (Ok(l), Ok(r)) = (left.try_borrow(), right.try_borrow()) else {
        return false;
    };
    model_pair_eq(&l, key.0, &r, key.1, memo)
}

fn model_pair_eq(left: &Model, left_id: usize, right: &Model, right_id: usize, memo: &mut Memo) -> bool {
    if left_id == right_id {
        return true;
    }
    if left.schema().id() != right.schema().id() {
        return false;
    }
    let key = (left_id, right_id);
    memo.insert(key);
    let equal = maps_eq(left.accepted(), right.accepted(), memo);
    memo.remove(&key);
    equal
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        models_equal(self, other)
    }
}
