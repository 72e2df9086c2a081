//! Cursors over collection queries.

use crate::collection::{Collection, LocalObserveHandle};
use crate::options::ObserveOptions;
use crate::query::QuerySpec;
use docket_core::{Document, Result, Transform};
use docket_incremental::{IndexedObserver, Observe, ObserveChanges};
use std::rc::Rc;

/// A reusable query against one collection.
///
/// A cursor holds no results: every read runs the query again, and every
/// observe call registers a new live query.
#[derive(Clone)]
pub struct Cursor {
    collection: Collection,
    spec: QuerySpec,
    transform: Option<Transform>,
}

impl Cursor {
    pub(crate) fn new(collection: Collection, spec: QuerySpec, transform: Option<Transform>) -> Self {
        Self {
            collection,
            spec,
            transform,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// Returns the matching documents without the transform applied.
    pub fn fetch_raw(&self) -> Vec<Document> {
        self.collection.run_query(&self.spec)
    }

    /// Returns the matching documents.
    pub fn fetch(&self) -> Vec<Document> {
        let docs = self.fetch_raw();
        match &self.transform {
            Some(transform) => docs.iter().map(|doc| transform(doc)).collect(),
            None => docs,
        }
    }

    pub fn for_each(&self, mut f: impl FnMut(&Document)) {
        for doc in self.fetch() {
            f(&doc);
        }
    }

    pub fn map<T>(&self, mut f: impl FnMut(&Document) -> T) -> Vec<T> {
        self.fetch().iter().map(|doc| f(doc)).collect()
    }

    pub fn count(&self) -> usize {
        self.fetch_raw().len()
    }

    /// Observes the query with id-based callbacks.
    ///
    /// The observer first receives an add for every current result. It is
    /// ordered if it says so through [`ObserveChanges::ordered`].
    pub fn observe_changes(&self, observer: impl ObserveChanges + 'static) -> Result<LocalObserveHandle> {
        self.observe_changes_with(observer, ObserveOptions::default())
    }

    pub fn observe_changes_with(
        &self,
        observer: impl ObserveChanges + 'static,
        options: ObserveOptions,
    ) -> Result<LocalObserveHandle> {
        let ordered = observer.ordered();
        self.collection
            .observe_query(self.spec.clone(), ordered, Rc::new(observer), !options.suppress_initial)
    }

    /// Observes the query with document-based callbacks, which receive
    /// whole transformed documents and, when ordered, their positions.
    pub fn observe<O: Observe + 'static>(&self, observer: O) -> Result<LocalObserveHandle> {
        self.observe_with(observer, ObserveOptions::default())
    }

    pub fn observe_with<O: Observe + 'static>(
        &self,
        observer: O,
        options: ObserveOptions,
    ) -> Result<LocalObserveHandle> {
        let mut indexed = IndexedObserver::new(observer, self.transform.clone());
        if options.suppress_initial {
            indexed = indexed.suppress_initial();
        }
        let indexed = Rc::new(indexed);
        let ordered = indexed.ordered();
        // The adapter needs the initial adds to learn the result set even
        // when the caller does not want to see them.
        let handle = self
            .collection
            .observe_query(self.spec.clone(), ordered, indexed.clone(), true)?;
        indexed.finish_initial();
        Ok(handle)
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &self.collection.name())
            .field("spec", &self.spec)
            .finish()
    }
}
