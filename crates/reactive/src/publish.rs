//! Publishing live queries to a network layer.
//!
//! A subscription's wire protocol only knows `added`, `changed` and
//! `removed` per collection and document id. `publish_cursor` drives a
//! `PublishSink` with exactly those calls from a shared live query.

use crate::hub::{LiveQueryHub, ObserveHandle};
use docket_core::{DocId, Document, Result};
use docket_incremental::{FieldChanges, ObserveChanges};
use docket_storage::Cursor;
use std::rc::Rc;

/// Receives the document-level messages of a publication.
pub trait PublishSink {
    fn added(&self, collection: &str, id: &DocId, fields: &Document);

    /// `fields` maps each changed field to its new value; `None` clears it.
    fn changed(&self, collection: &str, id: &DocId, fields: &FieldChanges);

    fn removed(&self, collection: &str, id: &DocId);
}

struct PublishObserver {
    collection: String,
    sink: Rc<dyn PublishSink>,
    ordered: bool,
}

impl ObserveChanges for PublishObserver {
    fn added(&self, id: &DocId, fields: &Document) {
        self.sink.added(&self.collection, id, fields);
    }

    fn added_before(&self, id: &DocId, fields: &Document, _before: Option<&DocId>) {
        self.sink.added(&self.collection, id, fields);
    }

    fn changed(&self, id: &DocId, fields: &FieldChanges) {
        self.sink.changed(&self.collection, id, fields);
    }

    // Clients keep their own order; moves are not sent.
    fn moved_before(&self, _id: &DocId, _before: Option<&DocId>) {}

    fn removed(&self, id: &DocId) {
        self.sink.removed(&self.collection, id);
    }

    fn ordered(&self) -> bool {
        self.ordered
    }
}

/// Publishes `cursor` to `sink` until the returned handle is stopped.
///
/// The sink first receives `added` for every current result. Cursors with
/// skip or limit are observed in order, since their window moves.
pub fn publish_cursor(hub: &LiveQueryHub, cursor: &Cursor, sink: Rc<dyn PublishSink>) -> Result<ObserveHandle> {
    let observer = PublishObserver {
        collection: cursor.collection().name().to_string(),
        sink,
        ordered: cursor.spec().is_limited(),
    };
    hub.observe_changes(cursor, observer)
}
