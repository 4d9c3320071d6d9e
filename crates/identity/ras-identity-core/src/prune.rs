//! Recursive removal of nil and empty values.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A value tree that can drop its blank descendants.
///
/// Blank means nil, an empty string, an empty map or an empty sequence.
/// Pruning runs bottom-up, so a map whose children were all blank becomes
/// blank itself and is removed by its parent.
pub trait Prune {
    fn prune(&mut self);

    fn is_blank(&self) -> bool;
}

/// Prunes `value` and hands it back.
pub fn pruned<T: Prune>(mut value: T) -> T {
    value.prune();
    value
}

impl Prune for Value {
    fn prune(&mut self) {
        match self {
            Value::Object(map) => map.prune(),
            Value::Array(items) => items.prune(),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

impl Prune for Map<String, Value> {
    fn prune(&mut self) {
        for value in self.values_mut() {
            value.prune();
        }
        self.retain(|_, value| !value.is_blank());
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Prune> Prune for Vec<T> {
    fn prune(&mut self) {
        for item in self.iter_mut() {
            item.prune();
        }
        self.retain(|item| !item.is_blank());
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<K: Ord, V: Prune> Prune for BTreeMap<K, V> {
    fn prune(&mut self) {
        for value in self.values_mut() {
            value.prune();
        }
        self.retain(|_, value| !value.is_blank());
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Prune> Prune for Option<T> {
    fn prune(&mut self) {
        if let Some(inner) = self {
            inner.prune();
            if inner.is_blank() {
                *self = None;
            }
        }
    }

    fn is_blank(&self) -> bool {
        self.as_ref().is_none_or(Prune::is_blank)
    }
}

impl Prune for String {
    fn prune(&mut self) {}

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}
