//! Pre-image journal.
//!
//! Between `save_originals` and `retrieve_originals` a collection records,
//! for every document a write touches, what that document looked like before
//! the first such write. Documents that did not exist yet map to `None`.

use docket_core::{DocId, Document};
use indexmap::IndexMap;

/// Pre-images keyed by id, in the order documents were first touched.
pub type Originals = IndexMap<DocId, Option<Document>>;

/// One journal entry: the state a document was first seen in.
#[derive(Clone, Debug, PartialEq)]
pub enum JournalEntry {
    /// The document was created by the first recorded write.
    Created,
    /// The document existed with these contents.
    Existing(Document),
}

impl JournalEntry {
    fn into_original(self) -> Option<Document> {
        match self {
            JournalEntry::Created => None,
            JournalEntry::Existing(doc) => Some(doc),
        }
    }
}

/// Records the first pre-image of each touched document.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: IndexMap<DocId, JournalEntry>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert of a document that did not exist.
    pub fn record_insert(&mut self, id: &DocId) {
        self.entries.entry(id.clone()).or_insert(JournalEntry::Created);
    }

    /// Records an update or removal of an existing document.
    ///
    /// Only the first call per id is kept; later pre-images are newer than
    /// the state the journal is meant to restore.
    pub fn record_existing(&mut self, id: &DocId, old: &Document) {
        if !self.entries.contains_key(id) {
            self.entries.insert(id.clone(), JournalEntry::Existing(old.clone()));
        }
    }

    /// Returns the entry for a document.
    pub fn get(&self, id: &DocId) -> Option<&JournalEntry> {
        self.entries.get(id)
    }

    /// Returns the number of touched documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was touched.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts the journal into the id to pre-image map.
    pub fn into_originals(self) -> Originals {
        self.entries
            .into_iter()
            .map(|(id, entry)| (id, entry.into_original()))
            .collect()
    }
}
