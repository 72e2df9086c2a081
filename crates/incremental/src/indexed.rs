//! Adapter from id-based deltas to whole-document events.

use crate::fields::{apply_changes, FieldChanges};
use crate::observer::{Observe, ObserveChanges};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use docket_core::{DocId, Document, Transform};

/// Drives an [`Observe`] from [`ObserveChanges`] calls.
///
/// Keeps its own copy of the result set (in order when the wrapped observer
/// is ordered) so it can hand out whole documents, their old versions and
/// their positions. Documents pass through the optional transform before
/// reaching the observer.
pub struct IndexedObserver<O> {
    observer: O,
    transform: Option<Transform>,
    docs: RefCell<Vec<(DocId, Document)>>,
    suppressed: Cell<bool>,
}

impl<O: Observe> IndexedObserver<O> {
    /// Wraps an observer.
    pub fn new(observer: O, transform: Option<Transform>) -> Self {
        Self {
            observer,
            transform,
            docs: RefCell::new(Vec::new()),
            suppressed: Cell::new(false),
        }
    }

    /// Tracks the initial adds without forwarding them, until
    /// [`finish_initial`](Self::finish_initial) is called.
    pub fn suppress_initial(self) -> Self {
        self.suppressed.set(true);
        self
    }

    /// Ends the initial-add phase; later events reach the observer.
    pub fn finish_initial(&self) {
        self.suppressed.set(false);
    }

    /// Returns the wrapped observer.
    pub fn inner(&self) -> &O {
        &self.observer
    }

    /// Returns the number of tracked documents.
    pub fn len(&self) -> usize {
        self.docs.borrow().len()
    }

    /// Returns true if no documents are tracked.
    pub fn is_empty(&self) -> bool {
        self.docs.borrow().is_empty()
    }

    fn project(&self, doc: &Document) -> Document {
        match &self.transform {
            Some(transform) => transform(doc),
            None => doc.clone(),
        }
    }

    fn position(&self, id: &DocId) -> Option<usize> {
        self.docs.borrow().iter().position(|(d, _)| d == id)
    }
}

impl<O: Observe> ObserveChanges for IndexedObserver<O> {
    fn added(&self, id: &DocId, fields: &Document) {
        let doc = Document::with_id(id, fields);
        let projected = self.project(&doc);
        self.docs.borrow_mut().push((id.clone(), doc));
        if !self.suppressed.get() {
            self.observer.added(&projected);
        }
    }

    fn added_before(&self, id: &DocId, fields: &Document, before: Option<&DocId>) {
        let doc = Document::with_id(id, fields);
        let projected = self.project(&doc);
        let index = {
            let mut docs = self.docs.borrow_mut();
            let index = before
                .and_then(|b| docs.iter().position(|(d, _)| d == b))
                .unwrap_or(docs.len());
            docs.insert(index, (id.clone(), doc));
            index
        };
        if !self.suppressed.get() {
            self.observer.added_at(&projected, index, before);
        }
    }

    fn changed(&self, id: &DocId, fields: &FieldChanges) {
        let (index, old_doc, new_doc) = {
            let mut docs = self.docs.borrow_mut();
            let index = match docs.iter().position(|(d, _)| d == id) {
                Some(index) => index,
                None => {
                    log::warn!("changed() for unknown document {}", id);
                    return;
                }
            };
            let old_doc = docs[index].1.clone();
            apply_changes(&mut docs[index].1, fields);
            (index, old_doc, docs[index].1.clone())
        };
        let new_doc = self.project(&new_doc);
        let old_doc = self.project(&old_doc);
        if self.observer.ordered() {
            self.observer.changed_at(&new_doc, &old_doc, index);
        } else {
            self.observer.changed(&new_doc, &old_doc);
        }
    }

    fn moved_before(&self, id: &DocId, before: Option<&DocId>) {
        let (from, to, doc) = {
            let mut docs = self.docs.borrow_mut();
            let from = match docs.iter().position(|(d, _)| d == id) {
                Some(from) => from,
                None => {
                    log::warn!("moved_before() for unknown document {}", id);
                    return;
                }
            };
            let entry = docs.remove(from);
            let to = before
                .and_then(|b| docs.iter().position(|(d, _)| d == b))
                .unwrap_or(docs.len());
            let doc = entry.1.clone();
            docs.insert(to, entry);
            (from, to, doc)
        };
        self.observer.moved_to(&self.project(&doc), from, to, before);
    }

    fn removed(&self, id: &DocId) {
        let index = match self.position(id) {
            Some(index) => index,
            None => {
                log::warn!("removed() for unknown document {}", id);
                return;
            }
        };
        let (_, doc) = self.docs.borrow_mut().remove(index);
        let doc = self.project(&doc);
        if self.observer.ordered() {
            self.observer.removed_at(&doc, index);
        } else {
            self.observer.removed(&doc);
        }
    }

    fn ordered(&self) -> bool {
        self.observer.ordered()
    }
}
