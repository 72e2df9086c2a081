//! Document collections.
//!
//! A `Collection` is a cheap handle (`Rc`) to an insertion-ordered map of
//! documents plus the live queries observing it. Writes update the stored
//! documents, bring every live query's results up to date, and queue the
//! resulting change events. The queue is drained once all internal borrows
//! are released, so callbacks are free to read, write, or stop handles.

use crate::cursor::Cursor;
use crate::id::random_id;
use crate::journal::{Journal, Originals};
use crate::modify::modify;
use crate::options::{CollectionOptions, FindOptions, UpdateOptions};
use crate::query::{candidates, LiveQuery, PendingEvents, QuerySpec};
use docket_core::{DocId, Document, Error, Result, Transform, Value, ID_FIELD};
use docket_incremental::{diff_query_changes, ChangeLog, ObserveChanges};
use docket_query::{compile_selector, ids_matched_by_selector, Matcher};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifies a live query within its collection.
pub type QueryId = u64;

/// Identifies a write listener within its collection.
pub type ListenerId = u64;

/// What a write touched, as reported to write listeners.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteNotification {
    pub collection: String,
    pub ids: Vec<DocId>,
}

type WriteListener = Rc<dyn Fn(&WriteNotification)>;

struct CollectionInner {
    name: String,
    transform: Option<Transform>,
    docs: RefCell<IndexMap<DocId, Document>>,
    queries: RefCell<BTreeMap<QueryId, LiveQuery>>,
    next_query_id: Cell<QueryId>,
    queue: RefCell<VecDeque<PendingEvents>>,
    draining: Cell<bool>,
    paused: Cell<bool>,
    saved_originals: RefCell<Option<Journal>>,
    listeners: RefCell<BTreeMap<ListenerId, WriteListener>>,
    next_listener_id: Cell<ListenerId>,
    dispatch_depth: Rc<Cell<usize>>,
}

/// A handle to an in-memory collection of documents.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<CollectionInner>,
}

/// Marks the collection as delivering callbacks while alive.
///
/// Observing the collection while any guard is alive fails with
/// `RecursiveObserve`.
pub struct DispatchGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Resets the draining flag even if a callback panics.
struct Draining<'a>(&'a Cell<bool>);

impl Drop for Draining<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Collection {
    /// Creates an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, CollectionOptions::default())
    }

    /// Creates an empty collection with options.
    pub fn with_options(name: impl Into<String>, options: CollectionOptions) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                name: name.into(),
                transform: options.transform,
                docs: RefCell::new(IndexMap::new()),
                queries: RefCell::new(BTreeMap::new()),
                next_query_id: Cell::new(0),
                queue: RefCell::new(VecDeque::new()),
                draining: Cell::new(false),
                paused: Cell::new(false),
                saved_originals: RefCell::new(None),
                listeners: RefCell::new(BTreeMap::new()),
                next_listener_id: Cell::new(0),
                dispatch_depth: Rc::new(Cell::new(0)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the collection transform.
    pub fn transform(&self) -> Option<Transform> {
        self.inner.transform.clone()
    }

    /// Returns the number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.docs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.docs.borrow().is_empty()
    }

    /// Returns a copy of the stored document, untransformed.
    pub fn get(&self, id: &DocId) -> Option<Document> {
        self.inner.docs.borrow().get(id).cloned()
    }

    /// Returns true if both handles refer to the same collection.
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Inserts a document and returns its id.
    ///
    /// A random id is assigned when `_id` is missing.
    pub fn insert(&self, doc: Document) -> Result<DocId> {
        let (id, doc) = match doc.get(ID_FIELD) {
            None => {
                let id = random_id();
                let doc = Document::with_id(&id, &doc);
                (id, doc)
            }
            Some(value) => match DocId::from_value(value) {
                Some(id) => (id, doc),
                None => {
                    return Err(Error::invalid_document(format!(
                        "_id must be a string or an ObjectId, got {:?}",
                        value
                    )));
                }
            },
        };

        {
            let mut docs = self.inner.docs.borrow_mut();
            if docs.contains_key(&id) {
                return Err(Error::duplicate_id(id));
            }
            docs.insert(id.clone(), doc.clone());
        }
        if let Some(journal) = self.inner.saved_originals.borrow_mut().as_mut() {
            journal.record_insert(&id);
        }
        log::trace!("{}: inserted {}", self.inner.name, id);

        self.maintain_queries(|query, docs, log| query.on_insert(&doc, docs, log));
        self.drain_queue();
        self.notify_write(vec![id.clone()]);
        Ok(id)
    }

    /// Applies `modifier` to the first matching document, or to all of them
    /// with `multi`, and returns how many documents were updated.
    ///
    /// The modifier is first tried on every target, so one that fails on any
    /// document leaves all of them untouched. Documents are then stored one
    /// at a time, each modified from its current version: a callback that
    /// writes a later target is not overwritten, and a target removed by a
    /// callback is skipped.
    pub fn update(&self, selector: &Value, modifier: &Value, options: UpdateOptions) -> Result<usize> {
        let matcher = compile_selector(selector)?;
        let ids = ids_matched_by_selector(selector);

        let targets: Vec<DocId> = {
            let docs = self.inner.docs.borrow();
            let mut targets = Vec::new();
            for doc in candidates(&docs, ids.as_deref()) {
                if !matcher.matches(doc) {
                    continue;
                }
                if let Some(id) = doc.id() {
                    modify(doc, modifier)?;
                    targets.push(id);
                }
                if !options.multi {
                    break;
                }
            }
            targets
        };

        let mut updated = Vec::with_capacity(targets.len());
        for id in targets {
            let (old_doc, new_doc) = {
                let mut docs = self.inner.docs.borrow_mut();
                let stored = match docs.get_mut(&id) {
                    Some(stored) => stored,
                    None => continue,
                };
                let new_doc = match modify(stored, modifier) {
                    Ok(new_doc) => new_doc,
                    Err(err) => {
                        log::warn!("{}: skipping {} changed by a callback: {}", self.inner.name, id, err);
                        continue;
                    }
                };
                (std::mem::replace(stored, new_doc.clone()), new_doc)
            };
            if let Some(journal) = self.inner.saved_originals.borrow_mut().as_mut() {
                journal.record_existing(&id, &old_doc);
            }
            log::trace!("{}: updated {}", self.inner.name, id);

            self.maintain_queries(|query, docs, log| query.on_update(&old_doc, &new_doc, docs, log));
            self.drain_queue();
            updated.push(id);
        }

        let count = updated.len();
        if count > 0 {
            self.notify_write(updated);
        }
        Ok(count)
    }

    /// Removes every matching document and returns how many were removed.
    pub fn remove(&self, selector: &Value) -> Result<usize> {
        let matcher = compile_selector(selector)?;
        let ids = ids_matched_by_selector(selector);

        let removed: Vec<Document> = {
            let mut docs = self.inner.docs.borrow_mut();
            let doomed: Vec<DocId> = candidates(&docs, ids.as_deref())
                .into_iter()
                .filter(|doc| matcher.matches(doc))
                .filter_map(Document::id)
                .collect();
            doomed.iter().filter_map(|id| docs.shift_remove(id)).collect()
        };
        if removed.is_empty() {
            return Ok(0);
        }

        if let Some(journal) = self.inner.saved_originals.borrow_mut().as_mut() {
            for doc in &removed {
                if let Some(id) = doc.id() {
                    journal.record_existing(&id, doc);
                }
            }
        }
        log::trace!("{}: removed {} documents", self.inner.name, removed.len());

        for doc in &removed {
            self.maintain_queries(|query, docs, log| query.on_remove(doc, docs, log));
        }
        self.drain_queue();
        self.notify_write(removed.iter().filter_map(Document::id).collect());
        Ok(removed.len())
    }

    /// Returns a cursor over the documents matching `selector`.
    pub fn find(&self, selector: &Value, options: FindOptions) -> Result<Cursor> {
        let matcher = compile_selector(selector)?;
        let ids = ids_matched_by_selector(selector);
        let spec = QuerySpec::new(Some(selector.clone()), matcher, ids, &options)?;
        Ok(self.cursor(spec, options))
    }

    /// Returns a cursor over the documents accepted by a prebuilt matcher,
    /// such as one made with `Matcher::from_fn`.
    pub fn find_with_matcher(&self, matcher: Matcher, options: FindOptions) -> Result<Cursor> {
        let spec = QuerySpec::new(None, matcher, None, &options)?;
        Ok(self.cursor(spec, options))
    }

    /// Returns the first matching document, transformed.
    pub fn find_one(&self, selector: &Value, options: FindOptions) -> Result<Option<Document>> {
        let cursor = self.find(selector, options.limit(1))?;
        Ok(cursor.fetch().into_iter().next())
    }

    fn cursor(&self, spec: QuerySpec, options: FindOptions) -> Cursor {
        let transform = options.transform.or_else(|| self.transform());
        Cursor::new(self.clone(), spec, transform)
    }

    /// Runs a query against the current documents, untransformed.
    pub fn run_query(&self, spec: &QuerySpec) -> Vec<Document> {
        spec.fetch(&self.inner.docs.borrow())
    }

    /// Stops delivering change events. Results keep tracking writes.
    pub fn pause_observers(&self) {
        if self.inner.paused.replace(true) {
            return;
        }
        for query in self.inner.queries.borrow_mut().values_mut() {
            query.snapshot = Some(query.results.clone());
        }
        log::debug!("{}: observers paused", self.inner.name);
    }

    /// Resumes event delivery, sending each observer the net difference
    /// between its results at pause time and now.
    pub fn resume_observers(&self) {
        if !self.inner.paused.replace(false) {
            return;
        }
        {
            let mut queries = self.inner.queries.borrow_mut();
            let mut queue = self.inner.queue.borrow_mut();
            for query in queries.values_mut() {
                if let Some(snapshot) = query.snapshot.take() {
                    let log = ChangeLog::new(query.ordered);
                    diff_query_changes(query.ordered, &snapshot, &query.results, &log);
                    if !log.is_empty() {
                        queue.push_back(query.pending(log.take()));
                    }
                }
            }
        }
        log::debug!("{}: observers resumed", self.inner.name);
        self.drain_queue();
    }

    /// Starts recording the pre-image of every document written from now on.
    pub fn save_originals(&self) -> Result<()> {
        let mut saved = self.inner.saved_originals.borrow_mut();
        if saved.is_some() {
            return Err(Error::invalid_operation(
                "save_originals called twice without retrieve_originals",
            ));
        }
        *saved = Some(Journal::new());
        Ok(())
    }

    /// Stops recording and returns the pre-images recorded since `save_originals`.
    pub fn retrieve_originals(&self) -> Result<Originals> {
        self.inner
            .saved_originals
            .borrow_mut()
            .take()
            .map(Journal::into_originals)
            .ok_or_else(|| Error::invalid_operation("retrieve_originals called without save_originals"))
    }

    /// Registers a function called after every write with the ids it touched.
    pub fn on_write(&self, listener: impl Fn(&WriteNotification) + 'static) -> ListenerId {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner.listeners.borrow_mut().insert(id, Rc::new(listener));
        id
    }

    /// Unregisters a write listener. Returns false if it was not registered.
    pub fn remove_write_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(&id).is_some()
    }

    /// Marks the collection as dispatching callbacks until the guard drops.
    pub fn begin_dispatch(&self) -> DispatchGuard {
        let depth = self.inner.dispatch_depth.clone();
        depth.set(depth.get() + 1);
        DispatchGuard { depth }
    }

    /// Returns true while callbacks of this collection are running.
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatch_depth.get() > 0
    }

    /// Returns the number of live queries.
    pub fn live_query_count(&self) -> usize {
        self.inner.queries.borrow().len()
    }

    /// Registers a live query and delivers its initial adds.
    pub(crate) fn observe_query(
        &self,
        spec: QuerySpec,
        ordered: bool,
        observer: Rc<dyn ObserveChanges>,
        deliver_initial: bool,
    ) -> Result<LocalObserveHandle> {
        if self.is_dispatching() {
            return Err(Error::recursive_observe(self.inner.name.as_str()));
        }
        if !ordered && spec.is_limited() {
            return Err(Error::invalid_operation(
                "unordered observe does not support skip or limit",
            ));
        }

        let results = self.run_query(&spec);
        let active = Rc::new(Cell::new(true));
        let paused = self.inner.paused.get();
        let query_id = self.inner.next_query_id.get();
        self.inner.next_query_id.set(query_id + 1);

        self.inner.queries.borrow_mut().insert(
            query_id,
            LiveQuery {
                spec,
                ordered,
                results: results.clone(),
                // While paused, the initial adds come out of the resume diff.
                snapshot: paused.then(Vec::new),
                observer: observer.clone(),
                active: active.clone(),
            },
        );
        log::debug!(
            "{}: live query {} started with {} documents",
            self.inner.name,
            query_id,
            results.len()
        );

        if deliver_initial && !paused {
            let _guard = self.begin_dispatch();
            for doc in &results {
                if !active.get() {
                    break;
                }
                if let Some(id) = doc.id() {
                    if ordered {
                        observer.added_before(&id, &doc.without_id(), None);
                    } else {
                        observer.added(&id, &doc.without_id());
                    }
                }
            }
        }

        Ok(LocalObserveHandle {
            collection: Rc::downgrade(&self.inner),
            query_id,
            active,
        })
    }

    /// Runs `f` on every live query, queueing the events it records.
    fn maintain_queries<F>(&self, mut f: F)
    where
        F: FnMut(&mut LiveQuery, &IndexMap<DocId, Document>, &ChangeLog),
    {
        let paused = self.inner.paused.get();
        let docs = self.inner.docs.borrow();
        let mut queries = self.inner.queries.borrow_mut();
        let mut queue = self.inner.queue.borrow_mut();
        for query in queries.values_mut() {
            let log = ChangeLog::new(query.ordered);
            f(query, &docs, &log);
            if !paused && !log.is_empty() {
                queue.push_back(query.pending(log.take()));
            }
        }
    }

    /// Delivers queued events in order. Writes made by callbacks queue their
    /// events behind the current ones and are delivered by this same loop.
    fn drain_queue(&self) {
        if self.inner.draining.replace(true) {
            return;
        }
        let _draining = Draining(&self.inner.draining);
        let _guard = self.begin_dispatch();
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            match next {
                Some(pending) => pending.deliver(),
                None => break,
            }
        }
    }

    fn notify_write(&self, ids: Vec<DocId>) {
        let listeners: Vec<WriteListener> = self.inner.listeners.borrow().values().cloned().collect();
        if listeners.is_empty() {
            return;
        }
        let notification = WriteNotification {
            collection: self.inner.name.clone(),
            ids,
        };
        for listener in listeners {
            listener(&notification);
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .field("live_queries", &self.live_query_count())
            .finish()
    }
}

/// Stops a locally observed query.
#[derive(Debug)]
pub struct LocalObserveHandle {
    collection: Weak<CollectionInner>,
    query_id: QueryId,
    active: Rc<Cell<bool>>,
}

impl LocalObserveHandle {
    /// Stops the query. Safe to call more than once and from callbacks.
    pub fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(inner) = self.collection.upgrade() {
            inner.queries.borrow_mut().remove(&self.query_id);
            log::debug!("{}: live query {} stopped", inner.name, self.query_id);
        }
    }

    pub fn is_stopped(&self) -> bool {
        !self.active.get()
    }

    pub fn query_id(&self) -> QueryId {
        self.query_id
    }
}
