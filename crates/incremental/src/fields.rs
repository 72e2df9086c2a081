//! Field-level change sets.
//!
//! A change set lists the top-level fields that differ between two versions
//! of a document: `Some(value)` for a new or replaced field, `None` for a
//! cleared one.

use alloc::string::String;
use alloc::vec::Vec;
use docket_core::{values_equal, Document, Value};

/// Top-level field changes in emission order.
pub type FieldChanges = Vec<(String, Option<Value>)>;

/// Computes the changes that turn `old` into `new`.
///
/// Set or replaced fields come first in `new`'s order, then cleared fields in
/// `old`'s order.
pub fn make_changed_fields(new: &Document, old: &Document) -> FieldChanges {
    let mut changes = FieldChanges::new();
    for (key, value) in new.iter() {
        match old.get(key) {
            Some(prev) if values_equal(prev, value) => {}
            _ => changes.push((String::from(key), Some(value.clone()))),
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            changes.push((String::from(key), None));
        }
    }
    changes
}

/// Applies a change set in place.
pub fn apply_changes(doc: &mut Document, changes: &FieldChanges) {
    for (key, value) in changes {
        match value {
            Some(value) => {
                doc.insert(key.as_str(), value.clone());
            }
            None => {
                doc.remove(key);
            }
        }
    }
}
