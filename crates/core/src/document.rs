//! Insertion-ordered documents.

use crate::compare::documents_equal;
use crate::id::DocId;
use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Field name of the document id.
pub const ID_FIELD: &str = "_id";

/// A string-keyed map of values that remembers insertion order.
///
/// Key order is observable: it drives object comparison and deep equality,
/// and replacing an existing key keeps its position.
#[derive(Clone, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates an empty document with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Gets a field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Gets a mutable field by name.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Sets a field, keeping its position when it already exists.
    ///
    /// Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.position(&key) {
            Some(pos) => Some(core::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes a field, preserving the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|pos| self.entries.remove(pos).1)
    }

    /// Returns true if the field exists.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Returns the field at `key`, inserting `default()` first if missing.
    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> Value) -> &mut Value {
        let pos = match self.position(key) {
            Some(pos) => pos,
            None => {
                self.entries.push((String::from(key), default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }

    /// Returns an iterator over field names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Returns an iterator over (name, value) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a mutable iterator over (name, value) pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Removes every field.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the `_id` if it holds an id type.
    pub fn id(&self) -> Option<DocId> {
        self.get(ID_FIELD).and_then(DocId::from_value)
    }

    /// Sets `_id`, keeping its position if present.
    pub fn set_id(&mut self, id: &DocId) {
        self.insert(ID_FIELD, id.to_value());
    }

    /// Returns a copy without `_id`, as handed to change observers.
    pub fn without_id(&self) -> Document {
        self.entries
            .iter()
            .filter(|(k, _)| k != ID_FIELD)
            .cloned()
            .collect()
    }

    /// Returns a copy with `id` as the first field, followed by `fields`.
    pub fn with_id(id: &DocId, fields: &Document) -> Document {
        let mut doc = Document::with_capacity(fields.len() + 1);
        doc.entries.push((String::from(ID_FIELD), id.to_value()));
        doc.entries.extend(
            fields
                .entries
                .iter()
                .filter(|(k, _)| k != ID_FIELD)
                .cloned(),
        );
        doc
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        documents_equal(self, other)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = alloc::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
