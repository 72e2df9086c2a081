//! Polling drivers.
//!
//! A `PollingDriver` keeps the last results of one query. Each poll re-runs
//! the query against its collection and diffs the fresh results against the
//! previous ones. Writes made under a fence are held by the driver until the
//! poll that covers them has been delivered.

use crate::fence::{FenceWrite, WriteFence};
use docket_core::Document;
use docket_incremental::{diff_query_changes, ChangeBatch, ChangeLog};
use docket_storage::{Collection, QuerySpec};
use std::cell::{Cell, RefCell};

pub struct PollingDriver {
    collection: Collection,
    spec: QuerySpec,
    ordered: bool,
    results: RefCell<Vec<Document>>,
    poll_count: Cell<u64>,
    dirty: Cell<bool>,
    pending_writes: RefCell<Vec<FenceWrite>>,
}

impl PollingDriver {
    /// Creates a driver and runs the query once.
    pub fn new(collection: Collection, spec: QuerySpec, ordered: bool) -> Self {
        let results = collection.run_query(&spec);
        Self {
            collection,
            spec,
            ordered,
            results: RefCell::new(results),
            poll_count: Cell::new(1),
            dirty: Cell::new(false),
            pending_writes: RefCell::new(Vec::new()),
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn ordered(&self) -> bool {
        self.ordered
    }

    /// Returns a copy of the results as of the last poll.
    pub fn results(&self) -> Vec<Document> {
        self.results.borrow().clone()
    }

    /// Returns how many times the query has run, including the first run.
    pub fn poll_count(&self) -> u64 {
        self.poll_count.get()
    }

    /// Returns true if a write was noted since the last poll.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Records that a write may have changed the results. The write is held
    /// open on `fence` until the next poll has been delivered.
    pub fn note_write(&self, fence: Option<&WriteFence>) {
        self.dirty.set(true);
        if let Some(fence) = fence {
            match fence.begin_write() {
                Ok(write) => self.pending_writes.borrow_mut().push(write),
                Err(err) => log::warn!("not holding write on fence: {}", err),
            }
        }
    }

    /// Commits every held fence write. Called when the driver's result set
    /// is torn down, since no later poll will cover them.
    pub fn stop(&self) {
        let writes = std::mem::take(&mut *self.pending_writes.borrow_mut());
        if !writes.is_empty() {
            log::debug!(
                "{}: committing {} fence writes of a stopped driver",
                self.collection.name(),
                writes.len()
            );
        }
        self.dirty.set(false);
        writes.into_iter().for_each(FenceWrite::committed);
    }

    /// Re-runs the query and returns the events that turn the previous
    /// results into the new ones, along with the fence writes the poll
    /// covers. The caller commits the writes once the events are delivered.
    ///
    /// This is a full re-scan of the collection (or of the ids the selector
    /// names) followed by a diff. Incremental per-write maintenance lives in
    /// the collection's local observers; the driver trades it for sharing
    /// one result set among many handles.
    pub fn poll(&self) -> (ChangeBatch, Vec<FenceWrite>) {
        let writes = std::mem::take(&mut *self.pending_writes.borrow_mut());
        self.dirty.set(false);
        self.poll_count.set(self.poll_count.get() + 1);

        let new_results = self.collection.run_query(&self.spec);
        let log = ChangeLog::new(self.ordered);
        {
            let mut results = self.results.borrow_mut();
            diff_query_changes(self.ordered, &results, &new_results, &log);
            *results = new_results;
        }
        log::trace!(
            "{}: poll {} produced {} events",
            self.collection.name(),
            self.poll_count.get(),
            log.len()
        );
        (log.take(), writes)
    }
}

impl std::fmt::Debug for PollingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingDriver")
            .field("collection", &self.collection.name())
            .field("ordered", &self.ordered)
            .field("poll_count", &self.poll_count.get())
            .field("dirty", &self.dirty.get())
            .finish()
    }
}
