//! Recorded change events.
//!
//! A `ChangeEvent` is one [`ObserveChanges`] call captured as data. Stores
//! record the events a write produces while holding their internal borrows
//! and deliver them once the borrows are released.

use crate::fields::FieldChanges;
use crate::observer::ObserveChanges;
use alloc::vec::Vec;
use core::cell::RefCell;
use docket_core::{DocId, Document};

/// One observer call.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    Added {
        id: DocId,
        fields: Document,
    },
    AddedBefore {
        id: DocId,
        fields: Document,
        before: Option<DocId>,
    },
    Changed {
        id: DocId,
        fields: FieldChanges,
    },
    MovedBefore {
        id: DocId,
        before: Option<DocId>,
    },
    Removed {
        id: DocId,
    },
}

impl ChangeEvent {
    /// Returns the id of the document the event is about.
    #[inline]
    pub fn id(&self) -> &DocId {
        match self {
            ChangeEvent::Added { id, .. }
            | ChangeEvent::AddedBefore { id, .. }
            | ChangeEvent::Changed { id, .. }
            | ChangeEvent::MovedBefore { id, .. }
            | ChangeEvent::Removed { id } => id,
        }
    }

    /// Replays the event on an observer.
    pub fn deliver(&self, observer: &dyn ObserveChanges) {
        match self {
            ChangeEvent::Added { id, fields } => observer.added(id, fields),
            ChangeEvent::AddedBefore { id, fields, before } => {
                observer.added_before(id, fields, before.as_ref())
            }
            ChangeEvent::Changed { id, fields } => observer.changed(id, fields),
            ChangeEvent::MovedBefore { id, before } => observer.moved_before(id, before.as_ref()),
            ChangeEvent::Removed { id } => observer.removed(id),
        }
    }

    /// Returns true for additions.
    #[inline]
    pub fn is_added(&self) -> bool {
        matches!(self, ChangeEvent::Added { .. } | ChangeEvent::AddedBefore { .. })
    }

    /// Returns true for removals.
    #[inline]
    pub fn is_removed(&self) -> bool {
        matches!(self, ChangeEvent::Removed { .. })
    }
}

/// A batch of events.
pub type ChangeBatch = Vec<ChangeEvent>;

/// An observer that records every call.
///
/// Ordered logs record `AddedBefore`; unordered ones record `Added`.
#[derive(Debug, Default)]
pub struct ChangeLog {
    ordered: bool,
    events: RefCell<ChangeBatch>,
}

impl ChangeLog {
    /// Creates an empty log.
    pub fn new(ordered: bool) -> Self {
        Self {
            ordered,
            events: RefCell::new(Vec::new()),
        }
    }

    /// Takes the recorded events, leaving the log empty.
    pub fn take(&self) -> ChangeBatch {
        core::mem::take(&mut *self.events.borrow_mut())
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    fn push(&self, event: ChangeEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl ObserveChanges for ChangeLog {
    fn added(&self, id: &DocId, fields: &Document) {
        self.push(ChangeEvent::Added {
            id: id.clone(),
            fields: fields.clone(),
        });
    }

    fn added_before(&self, id: &DocId, fields: &Document, before: Option<&DocId>) {
        if !self.ordered {
            return self.added(id, fields);
        }
        self.push(ChangeEvent::AddedBefore {
            id: id.clone(),
            fields: fields.clone(),
            before: before.cloned(),
        });
    }

    fn changed(&self, id: &DocId, fields: &FieldChanges) {
        self.push(ChangeEvent::Changed {
            id: id.clone(),
            fields: fields.clone(),
        });
    }

    fn moved_before(&self, id: &DocId, before: Option<&DocId>) {
        if self.ordered {
            self.push(ChangeEvent::MovedBefore {
                id: id.clone(),
                before: before.cloned(),
            });
        }
    }

    fn removed(&self, id: &DocId) {
        self.push(ChangeEvent::Removed { id: id.clone() });
    }

    fn ordered(&self) -> bool {
        self.ordered
    }
}
