//! Live result sets shared by identical observes.
//!
//! A `LiveResultSet` owns the polling driver of one query and fans the events
//! of every poll out to all of its handles. Handles are added and removed
//! independently; when the last one goes, the set stops for good.

use crate::driver::PollingDriver;
use crate::invalidation::SetId;
use docket_core::{Error, Result};
use docket_incremental::{ChangeBatch, ObserveChanges};
use docket_storage::Collection;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Identifies a handle within its live result set.
pub type HandleId = u64;

pub struct LiveResultSet {
    id: SetId,
    key: Option<String>,
    collection: Collection,
    driver: PollingDriver,
    handles: RefCell<BTreeMap<HandleId, Rc<dyn ObserveChanges>>>,
    next_handle_id: Cell<HandleId>,
    stopped: Cell<bool>,
}

impl LiveResultSet {
    pub(crate) fn new(id: SetId, key: Option<String>, collection: Collection, driver: PollingDriver) -> Self {
        Self {
            id,
            key,
            collection,
            driver,
            handles: RefCell::new(BTreeMap::new()),
            next_handle_id: Cell::new(1),
            stopped: Cell::new(false),
        }
    }

    pub fn id(&self) -> SetId {
        self.id
    }

    /// The dedup key identical observes share, if the query has one.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn driver(&self) -> &PollingDriver {
        &self.driver
    }

    pub fn ordered(&self) -> bool {
        self.driver.ordered()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.borrow().len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Adds a handle and sends it one add per cached result.
    ///
    /// Fails with `ObserverStopped` once the set has lost its last handle.
    pub(crate) fn add_handle(&self, observer: Rc<dyn ObserveChanges>) -> Result<HandleId> {
        if self.stopped.get() {
            return Err(Error::ObserverStopped);
        }
        let handle_id = self.next_handle_id.get();
        self.next_handle_id.set(handle_id + 1);
        self.handles.borrow_mut().insert(handle_id, observer.clone());

        let _guard = self.collection.begin_dispatch();
        for doc in self.driver.results() {
            if !self.has_handle(handle_id) {
                break;
            }
            if let Some(id) = doc.id() {
                if self.ordered() {
                    observer.added_before(&id, &doc.without_id(), None);
                } else {
                    observer.added(&id, &doc.without_id());
                }
            }
        }
        Ok(handle_id)
    }

    /// Removes a handle. Returns true if it was the last one, in which case
    /// the set is now stopped.
    pub(crate) fn remove_handle(&self, handle_id: HandleId) -> bool {
        let mut handles = self.handles.borrow_mut();
        if handles.remove(&handle_id).is_none() || !handles.is_empty() {
            return false;
        }
        self.stopped.set(true);
        true
    }

    fn has_handle(&self, handle_id: HandleId) -> bool {
        self.handles.borrow().contains_key(&handle_id)
    }

    /// Sends each event to every handle, in handle order. A handle stopped
    /// by a callback misses the rest of the batch; the others do not.
    pub(crate) fn dispatch(&self, events: &ChangeBatch) {
        if events.is_empty() {
            return;
        }
        let _guard = self.collection.begin_dispatch();
        for event in events {
            let handle_ids: Vec<HandleId> = self.handles.borrow().keys().copied().collect();
            for handle_id in handle_ids {
                let observer = self.handles.borrow().get(&handle_id).cloned();
                if let Some(observer) = observer {
                    event.deliver(observer.as_ref());
                }
            }
        }
    }

    /// Polls the driver, delivers the result, then commits the fence writes
    /// the poll covered.
    pub(crate) fn poll(&self) {
        let (events, writes) = self.driver.poll();
        self.dispatch(&events);
        for write in writes {
            write.committed();
        }
    }
}

impl std::fmt::Debug for LiveResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveResultSet")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("handles", &self.handle_count())
            .field("stopped", &self.stopped.get())
            .field("driver", &self.driver)
            .finish()
    }
}
