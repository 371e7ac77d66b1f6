//! Rollback of instance trees
//!
//! Validating or importing an instance also commits into the sub-instances
//! it reaches. A `Snapshot` records the stores of the whole reachable tree
//! before such a call so that a failed call can put every instance back.

use std::collections::HashSet;

use crate::transforms::model_address;
use crate::value::{ModelRef, Native, NativeMap};

use super::instance::Model;

struct Saved {
    pending: NativeMap,
    accepted: NativeMap,
}

impl Saved {
    fn of(model: &Model) -> Self {
        Self {
            pending: model.pending().clone(),
            accepted: model.accepted().clone(),
        }
    }
}

/// Stores of an instance and of every sub-instance reachable from it
pub(crate) struct Snapshot {
    root: Saved,
    nested: Vec<(ModelRef, Saved)>,
}

impl Snapshot {
    pub(crate) fn capture(model: &Model) -> Self {
        let mut seen = HashSet::from([model_address(model)]);
        let mut nested = Vec::new();
        collect_model(model, &mut seen, &mut nested);
        Self {
            root: Saved::of(model),
            nested,
        }
    }

    /// Puts `model` and its recorded sub-instances back.
    ///
    /// An instance borrowed elsewhere is one the failed call never
    /// committed into, and is left alone.
    pub(crate) fn restore(self, model: &mut Model) {
        model.replace_stores(self.root.pending, self.root.accepted);
        for (instance, saved) in self.nested {
            if let Ok(mut inner) = instance.try_borrow_mut() {
                inner.replace_stores(saved.pending, saved.accepted);
            }
        }
    }
}

fn collect_model(model: &Model, seen: &mut HashSet<usize>, out: &mut Vec<(ModelRef, Saved)>) {
    for value in model.pending().values().chain(model.accepted().values()) {
        collect(value, seen, out);
    }
}

fn collect(value: &Native, seen: &mut HashSet<usize>, out: &mut Vec<(ModelRef, Saved)>) {
    match value {
        Native::Model(instance) => {
            if !seen.insert(instance.address()) {
                return;
            }
            // Mutably borrowed: the caller's own instance, already recorded.
            let Ok(inner) = instance.try_borrow() else {
                return;
            };
            out.push((instance.clone(), Saved::of(&inner)));
            collect_model(&inner, seen, out);
        }
        Native::List(items) => items.iter().for_each(|item| collect(item, seen, out)),
        Native::Map(map) => map.values().for_each(|item| collect(item, seen, out)),
        _ => {}
    }
}
