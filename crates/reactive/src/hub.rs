//! The live query hub of a collection.
//!
//! `LiveQueryHub` deduplicates observes: identical queries share one
//! `LiveResultSet`, so a write costs one poll per distinct query rather than
//! one per observer. It listens to the collection's writes, routes them
//! through an `InvalidationIndex` and polls the affected result sets.
//!
//! Polls run from a queue drained by the outermost write. A write made from
//! inside an observer callback therefore waits until the current delivery
//! finishes instead of interleaving with it.

use crate::driver::PollingDriver;
use crate::fence::WriteFence;
use crate::invalidation::{InvalidationIndex, SetId};
use crate::multiplexer::{HandleId, LiveResultSet};
use docket_core::{Error, Result};
use docket_incremental::{IndexedObserver, Observe, ObserveChanges};
use docket_storage::{Collection, Cursor, ListenerId, WriteNotification};
use hashbrown::HashMap;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

struct HubInner {
    collection: Collection,
    listener: Cell<Option<ListenerId>>,
    sets: RefCell<BTreeMap<SetId, Rc<LiveResultSet>>>,
    by_key: RefCell<HashMap<String, SetId>>,
    index: RefCell<InvalidationIndex>,
    next_set_id: Cell<SetId>,
    current_fence: RefCell<Option<WriteFence>>,
    suspended: Cell<bool>,
    queue: RefCell<VecDeque<SetId>>,
    draining: Cell<bool>,
}

/// Shares live result sets among the observers of one collection.
#[derive(Clone)]
pub struct LiveQueryHub {
    inner: Rc<HubInner>,
}

struct Draining<'a>(&'a Cell<bool>);

impl Drop for Draining<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct RestoreFence<'a> {
    slot: &'a RefCell<Option<WriteFence>>,
    previous: Option<WriteFence>,
}

impl Drop for RestoreFence<'_> {
    fn drop(&mut self) {
        *self.slot.borrow_mut() = self.previous.take();
    }
}

impl LiveQueryHub {
    /// Creates a hub and subscribes it to the collection's writes.
    pub fn new(collection: &Collection) -> Self {
        let inner = Rc::new(HubInner {
            collection: collection.clone(),
            listener: Cell::new(None),
            sets: RefCell::new(BTreeMap::new()),
            by_key: RefCell::new(HashMap::new()),
            index: RefCell::new(InvalidationIndex::new()),
            next_set_id: Cell::new(1),
            current_fence: RefCell::new(None),
            suspended: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
        });
        let weak = Rc::downgrade(&inner);
        let listener = collection.on_write(move |notification| {
            if let Some(inner) = weak.upgrade() {
                inner.on_write(notification);
            }
        });
        inner.listener.set(Some(listener));
        Self { inner }
    }

    pub fn collection(&self) -> &Collection {
        &self.inner.collection
    }

    /// Returns the number of live result sets.
    pub fn live_result_set_count(&self) -> usize {
        self.inner.sets.borrow().len()
    }

    /// Observes a cursor with id-based callbacks, joining an identical live
    /// result set if one exists.
    ///
    /// The observer receives one add per current result either way; joining
    /// does not poll.
    pub fn observe_changes(
        &self,
        cursor: &Cursor,
        observer: impl ObserveChanges + 'static,
    ) -> Result<ObserveHandle> {
        let ordered = observer.ordered();
        self.observe_rc(cursor, ordered, Rc::new(observer))
    }

    /// Observes a cursor with document-based callbacks. Documents pass
    /// through the cursor's transform.
    pub fn observe<O: Observe + 'static>(&self, cursor: &Cursor, observer: O) -> Result<ObserveHandle> {
        let indexed = IndexedObserver::new(observer, cursor.transform().cloned());
        let ordered = indexed.ordered();
        self.observe_rc(cursor, ordered, Rc::new(indexed))
    }

    fn observe_rc(&self, cursor: &Cursor, ordered: bool, observer: Rc<dyn ObserveChanges>) -> Result<ObserveHandle> {
        let inner = &self.inner;
        if !cursor.collection().ptr_eq(&inner.collection) {
            return Err(Error::invalid_operation(format!(
                "cursor on {} observed through the hub of {}",
                cursor.collection().name(),
                inner.collection.name()
            )));
        }
        if inner.collection.is_dispatching() {
            return Err(Error::recursive_observe(inner.collection.name()));
        }
        let spec = cursor.spec();
        if !ordered && spec.is_limited() {
            return Err(Error::invalid_operation(
                "unordered observe does not support skip or limit",
            ));
        }

        let mut key = spec.dedup_key(ordered);
        let existing = key
            .as_ref()
            .and_then(|key| inner.by_key.borrow().get(key).copied())
            .and_then(|id| inner.sets.borrow().get(&id).cloned());
        let set = match existing {
            Some(set) if set.ordered() == ordered && set.driver().spec().same_query(spec) => {
                log::debug!("{}: joining live result set {}", inner.collection.name(), set.id());
                set
            }
            Some(set) => {
                log::warn!(
                    "{}: dedup key collides with live result set {}; not sharing it",
                    inner.collection.name(),
                    set.id()
                );
                key = None;
                inner.create_set(cursor, ordered, key)
            }
            None => inner.create_set(cursor, ordered, key),
        };

        let handle_id = set.add_handle(observer)?;
        Ok(ObserveHandle {
            hub: Rc::downgrade(inner),
            set,
            handle_id,
            stopped: Cell::new(false),
        })
    }

    /// Runs `f` with `fence` as the current write fence: every live result
    /// set affected by a write made inside `f` holds a write on the fence
    /// until it has delivered the poll covering it.
    pub fn with_write_fence<R>(&self, fence: &WriteFence, f: impl FnOnce() -> R) -> R {
        let previous = self.inner.current_fence.replace(Some(fence.clone()));
        let _restore = RestoreFence {
            slot: &self.inner.current_fence,
            previous,
        };
        f()
    }

    /// Defers polls. Writes keep being noted, and fence writes held.
    pub fn suspend_polling(&self) {
        self.inner.suspended.set(true);
    }

    /// Polls every result set that saw a write while polling was suspended.
    pub fn resume_polling(&self) {
        let inner = &self.inner;
        if !inner.suspended.replace(false) {
            return;
        }
        {
            let sets = inner.sets.borrow();
            let mut queue = inner.queue.borrow_mut();
            for (id, set) in sets.iter() {
                if set.driver().is_dirty() && !queue.contains(id) {
                    queue.push_back(*id);
                }
            }
        }
        inner.drain_queue();
    }

    pub fn is_polling_suspended(&self) -> bool {
        self.inner.suspended.get()
    }
}

impl HubInner {
    fn create_set(&self, cursor: &Cursor, ordered: bool, key: Option<String>) -> Rc<LiveResultSet> {
        let id = self.next_set_id.get();
        self.next_set_id.set(id + 1);

        let spec = cursor.spec().clone();
        self.index.borrow_mut().register(id, spec.ids());
        let driver = PollingDriver::new(self.collection.clone(), spec, ordered);
        let set = Rc::new(LiveResultSet::new(id, key.clone(), self.collection.clone(), driver));
        self.sets.borrow_mut().insert(id, set.clone());
        if let Some(key) = key {
            self.by_key.borrow_mut().insert(key, id);
        }
        log::debug!("{}: live result set {} created", self.collection.name(), id);
        set
    }

    /// Unregisters a stopped set. Fence writes it was still holding are
    /// committed, since no poll will ever cover them.
    fn remove_set(&self, set: &LiveResultSet) {
        set.driver().stop();
        self.sets.borrow_mut().remove(&set.id());
        self.index.borrow_mut().unregister(set.id());
        if let Some(key) = set.key() {
            let mut by_key = self.by_key.borrow_mut();
            if by_key.get(key) == Some(&set.id()) {
                by_key.remove(key);
            }
        }
        log::debug!("{}: live result set {} torn down", self.collection.name(), set.id());
    }

    fn on_write(&self, notification: &WriteNotification) {
        let affected = self.index.borrow().affected(&notification.ids);
        log::trace!(
            "{}: write to {} documents affects {} result sets",
            notification.collection,
            notification.ids.len(),
            affected.len()
        );
        let fence = self.current_fence.borrow().clone();
        {
            let sets = self.sets.borrow();
            let mut queue = self.queue.borrow_mut();
            for id in affected {
                if let Some(set) = sets.get(&id) {
                    set.driver().note_write(fence.as_ref());
                    if !queue.contains(&id) {
                        queue.push_back(id);
                    }
                }
            }
        }
        if !self.suspended.get() {
            self.drain_queue();
        }
    }

    fn drain_queue(&self) {
        if self.draining.replace(true) {
            return;
        }
        let _draining = Draining(&self.draining);
        loop {
            if self.suspended.get() {
                break;
            }
            let next = self.queue.borrow_mut().pop_front();
            let id = match next {
                Some(id) => id,
                None => break,
            };
            let set = self.sets.borrow().get(&id).cloned();
            if let Some(set) = set {
                if set.driver().is_dirty() {
                    set.poll();
                }
            }
        }
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.collection.remove_write_listener(listener);
        }
    }
}

impl std::fmt::Debug for LiveQueryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQueryHub")
            .field("collection", &self.inner.collection.name())
            .field("live_result_sets", &self.live_result_set_count())
            .field("suspended", &self.inner.suspended.get())
            .finish()
    }
}

/// One observer's membership in a live result set.
pub struct ObserveHandle {
    hub: Weak<HubInner>,
    set: Rc<LiveResultSet>,
    handle_id: HandleId,
    stopped: Cell<bool>,
}

impl ObserveHandle {
    /// Stops this observer. The live result set is torn down with its last
    /// handle. Safe to call more than once and from callbacks.
    pub fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        if self.set.remove_handle(self.handle_id) {
            if let Some(hub) = self.hub.upgrade() {
                hub.remove_set(&self.set);
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Adds another observer to the same live result set.
    ///
    /// Fails with `ObserverStopped` once the set has been torn down.
    pub fn join(&self, observer: impl ObserveChanges + 'static) -> Result<ObserveHandle> {
        let collection = self.set.collection();
        if collection.is_dispatching() {
            return Err(Error::recursive_observe(collection.name()));
        }
        let handle_id = self.set.add_handle(Rc::new(observer))?;
        Ok(ObserveHandle {
            hub: self.hub.clone(),
            set: self.set.clone(),
            handle_id,
            stopped: Cell::new(false),
        })
    }

    pub fn live_result_set(&self) -> &Rc<LiveResultSet> {
        &self.set
    }

    /// Returns how many times the shared query has run.
    pub fn poll_count(&self) -> u64 {
        self.set.driver().poll_count()
    }
}

impl std::fmt::Debug for ObserveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserveHandle")
            .field("set", &self.set.id())
            .field("handle", &self.handle_id)
            .field("stopped", &self.stopped.get())
            .finish()
    }
}
