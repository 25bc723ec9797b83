//! Per-character formatting attributes.
//!
//! Attributes ride along on retain and insert components. They are opaque to
//! the algebra except for one convention: the JSON value `false` on a retain
//! means "remove this key from the characters being retained".

use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute map carried by retain and insert components.
pub type Attributes = BTreeMap<String, Value>;

/// Whether a value marks the removal of its key.
pub fn is_removal(value: &Value) -> bool {
    matches!(value, Value::Bool(false))
}

/// Merge the attributes of two sequential components.
///
/// The second component's values win. When the first component is an insert,
/// a removal in the second drops the key entirely since the freshly inserted
/// text never carried it.
pub fn compose_attributes(first: &Attributes, second: &Attributes, first_is_insert: bool) -> Attributes {
    let mut merged = first.clone();
    for (key, value) in second {
        if first_is_insert && is_removal(value) {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Rebase the attributes of two concurrent retains against each other.
///
/// Keys touched by one side only stay on that side. Keys set to the same value
/// by both sides need no further change on either. On a conflict the first
/// operand's value wins and is kept on its side only.
pub fn transform_attributes(first: &Attributes, second: &Attributes) -> (Attributes, Attributes) {
    let mut first_prime = Attributes::new();
    let mut second_prime = Attributes::new();

    for (key, value) in first {
        match second.get(key) {
            None => {
                first_prime.insert(key.clone(), value.clone());
            }
            Some(other) if other == value => {}
            Some(_) => {
                first_prime.insert(key.clone(), value.clone());
            }
        }
    }
    for (key, value) in second {
        if !first.contains_key(key) {
            second_prime.insert(key.clone(), value.clone());
        }
    }

    (first_prime, second_prime)
}

/// Apply a retain's attribute update to one character's current attributes.
pub fn apply_attributes(current: &Attributes, update: &Attributes) -> Attributes {
    let mut updated = current.clone();
    for (key, value) in update {
        if is_removal(value) {
            updated.remove(key);
        } else {
            updated.insert(key.clone(), value.clone());
        }
    }
    updated
}
