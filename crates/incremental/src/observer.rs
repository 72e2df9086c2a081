//! Observer protocols.
//!
//! Two callback shapes are supported:
//!
//! - [`ObserveChanges`]: id-based deltas carrying only the changed fields
//! - [`Observe`]: whole documents, with positions when the query is ordered
//!
//! Every method has a no-op default, so an observer implements only what it
//! needs. Both traits take `&self`; observers that record state use interior
//! mutability.

use crate::fields::FieldChanges;
use alloc::boxed::Box;
use docket_core::{DocId, Document};

/// Receives id-based result set deltas.
///
/// `fields` never contains `_id`.
pub trait ObserveChanges {
    /// A document entered an unordered result set.
    fn added(&self, _id: &DocId, _fields: &Document) {}

    /// A document entered an ordered result set before `before` (`None`: at the end).
    ///
    /// Defaults to [`ObserveChanges::added`].
    fn added_before(&self, id: &DocId, fields: &Document, _before: Option<&DocId>) {
        self.added(id, fields);
    }

    /// Top-level fields of a document changed.
    fn changed(&self, _id: &DocId, _fields: &FieldChanges) {}

    /// A document moved before `before` (`None`: to the end).
    fn moved_before(&self, _id: &DocId, _before: Option<&DocId>) {}

    /// A document left the result set.
    fn removed(&self, _id: &DocId) {}

    /// Whether this observer wants positional events.
    fn ordered(&self) -> bool {
        false
    }
}

type AddedFn = Box<dyn Fn(&DocId, &Document)>;
type AddedBeforeFn = Box<dyn Fn(&DocId, &Document, Option<&DocId>)>;
type ChangedFn = Box<dyn Fn(&DocId, &FieldChanges)>;
type MovedBeforeFn = Box<dyn Fn(&DocId, Option<&DocId>)>;
type RemovedFn = Box<dyn Fn(&DocId)>;

/// An [`ObserveChanges`] built from closures.
///
/// Setting `added_before` or `moved_before` makes the observer ordered.
///
/// ```rust
/// use docket_incremental::{ChangeCallbacks, ObserveChanges};
///
/// let cb = ChangeCallbacks::new().on_added(|id, _| println!("added {}", id));
/// assert!(!cb.ordered());
/// let cb = cb.on_moved_before(|_, _| {});
/// assert!(cb.ordered());
/// ```
#[derive(Default)]
pub struct ChangeCallbacks {
    added: Option<AddedFn>,
    added_before: Option<AddedBeforeFn>,
    changed: Option<ChangedFn>,
    moved_before: Option<MovedBeforeFn>,
    removed: Option<RemovedFn>,
}

impl ChangeCallbacks {
    /// Creates a set of callbacks that ignores everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_added(mut self, f: impl Fn(&DocId, &Document) + 'static) -> Self {
        self.added = Some(Box::new(f));
        self
    }

    pub fn on_added_before(mut self, f: impl Fn(&DocId, &Document, Option<&DocId>) + 'static) -> Self {
        self.added_before = Some(Box::new(f));
        self
    }

    pub fn on_changed(mut self, f: impl Fn(&DocId, &FieldChanges) + 'static) -> Self {
        self.changed = Some(Box::new(f));
        self
    }

    pub fn on_moved_before(mut self, f: impl Fn(&DocId, Option<&DocId>) + 'static) -> Self {
        self.moved_before = Some(Box::new(f));
        self
    }

    pub fn on_removed(mut self, f: impl Fn(&DocId) + 'static) -> Self {
        self.removed = Some(Box::new(f));
        self
    }
}

impl ObserveChanges for ChangeCallbacks {
    fn added(&self, id: &DocId, fields: &Document) {
        if let Some(f) = &self.added {
            f(id, fields);
        }
    }

    fn added_before(&self, id: &DocId, fields: &Document, before: Option<&DocId>) {
        match &self.added_before {
            Some(f) => f(id, fields, before),
            None => ObserveChanges::added(self, id, fields),
        }
    }

    fn changed(&self, id: &DocId, fields: &FieldChanges) {
        if let Some(f) = &self.changed {
            f(id, fields);
        }
    }

    fn moved_before(&self, id: &DocId, before: Option<&DocId>) {
        if let Some(f) = &self.moved_before {
            f(id, before);
        }
    }

    fn removed(&self, id: &DocId) {
        if let Some(f) = &self.removed {
            f(id);
        }
    }

    fn ordered(&self) -> bool {
        self.added_before.is_some() || self.moved_before.is_some()
    }
}

/// Receives whole-document result set events.
///
/// The positional forms default to their plain counterparts.
pub trait Observe {
    /// A document entered the results at `index`, before `before`.
    fn added_at(&self, doc: &Document, _index: usize, _before: Option<&DocId>) {
        self.added(doc);
    }

    fn added(&self, _doc: &Document) {}

    /// A document at `index` changed from `old_doc` to `new_doc`.
    fn changed_at(&self, new_doc: &Document, old_doc: &Document, _index: usize) {
        self.changed(new_doc, old_doc);
    }

    fn changed(&self, _new_doc: &Document, _old_doc: &Document) {}

    /// A document moved from `from` to `to`; `to` is its index after the move.
    fn moved_to(&self, _doc: &Document, _from: usize, _to: usize, _before: Option<&DocId>) {}

    /// The document at `index` left the results.
    fn removed_at(&self, doc: &Document, _index: usize) {
        self.removed(doc);
    }

    fn removed(&self, _doc: &Document) {}

    /// Whether this observer wants positional events.
    fn ordered(&self) -> bool {
        false
    }
}

type DocFn = Box<dyn Fn(&Document)>;
type DocAtFn = Box<dyn Fn(&Document, usize, Option<&DocId>)>;
type DocChangedFn = Box<dyn Fn(&Document, &Document)>;
type DocChangedAtFn = Box<dyn Fn(&Document, &Document, usize)>;
type MovedToFn = Box<dyn Fn(&Document, usize, usize, Option<&DocId>)>;
type RemovedAtFn = Box<dyn Fn(&Document, usize)>;

/// An [`Observe`] built from closures.
///
/// Setting any positional callback makes the observer ordered; positional
/// events then fall back to the plain callbacks where no positional one is set.
#[derive(Default)]
pub struct ObserveCallbacks {
    added_at: Option<DocAtFn>,
    added: Option<DocFn>,
    changed_at: Option<DocChangedAtFn>,
    changed: Option<DocChangedFn>,
    moved_to: Option<MovedToFn>,
    removed_at: Option<RemovedAtFn>,
    removed: Option<DocFn>,
}

impl ObserveCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_added_at(mut self, f: impl Fn(&Document, usize, Option<&DocId>) + 'static) -> Self {
        self.added_at = Some(Box::new(f));
        self
    }

    pub fn on_added(mut self, f: impl Fn(&Document) + 'static) -> Self {
        self.added = Some(Box::new(f));
        self
    }

    pub fn on_changed_at(mut self, f: impl Fn(&Document, &Document, usize) + 'static) -> Self {
        self.changed_at = Some(Box::new(f));
        self
    }

    pub fn on_changed(mut self, f: impl Fn(&Document, &Document) + 'static) -> Self {
        self.changed = Some(Box::new(f));
        self
    }

    pub fn on_moved_to(mut self, f: impl Fn(&Document, usize, usize, Option<&DocId>) + 'static) -> Self {
        self.moved_to = Some(Box::new(f));
        self
    }

    pub fn on_removed_at(mut self, f: impl Fn(&Document, usize) + 'static) -> Self {
        self.removed_at = Some(Box::new(f));
        self
    }

    pub fn on_removed(mut self, f: impl Fn(&Document) + 'static) -> Self {
        self.removed = Some(Box::new(f));
        self
    }
}

impl Observe for ObserveCallbacks {
    fn added_at(&self, doc: &Document, index: usize, before: Option<&DocId>) {
        match &self.added_at {
            Some(f) => f(doc, index, before),
            None => Observe::added(self, doc),
        }
    }

    fn added(&self, doc: &Document) {
        if let Some(f) = &self.added {
            f(doc);
        }
    }

    fn changed_at(&self, new_doc: &Document, old_doc: &Document, index: usize) {
        match &self.changed_at {
            Some(f) => f(new_doc, old_doc, index),
            None => Observe::changed(self, new_doc, old_doc),
        }
    }

    fn changed(&self, new_doc: &Document, old_doc: &Document) {
        if let Some(f) = &self.changed {
            f(new_doc, old_doc);
        }
    }

    fn moved_to(&self, doc: &Document, from: usize, to: usize, before: Option<&DocId>) {
        if let Some(f) = &self.moved_to {
            f(doc, from, to, before);
        }
    }

    fn removed_at(&self, doc: &Document, index: usize) {
        match &self.removed_at {
            Some(f) => f(doc, index),
            None => Observe::removed(self, doc),
        }
    }

    fn removed(&self, doc: &Document) {
        if let Some(f) = &self.removed {
            f(doc);
        }
    }

    fn ordered(&self) -> bool {
        self.added_at.is_some()
            || self.changed_at.is_some()
            || self.moved_to.is_some()
            || self.removed_at.is_some()
    }
}
