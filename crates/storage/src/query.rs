//! Compiled queries and locally maintained live queries.

use crate::options::FindOptions;
use docket_core::{values_equal, DocId, Document, Result, Value};
use docket_incremental::{diff_query_changes, make_changed_fields, ChangeBatch, ChangeLog, ObserveChanges};
use docket_query::{compile_sort, insert_in_sorted, Matcher, Sorter};
use indexmap::IndexMap;
use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

/// A compiled (selector, sort, skip, limit) query.
#[derive(Clone, Debug)]
pub struct QuerySpec {
    selector: Option<Value>,
    matcher: Matcher,
    sort: Option<Value>,
    sorter: Option<Sorter>,
    skip: usize,
    limit: Option<usize>,
    ids: Option<Vec<DocId>>,
}

impl QuerySpec {
    /// Builds a query. `selector` is the source the matcher was compiled
    /// from, if any; `ids` restricts the scan to those documents.
    pub fn new(
        selector: Option<Value>,
        matcher: Matcher,
        ids: Option<Vec<DocId>>,
        options: &FindOptions,
    ) -> Result<Self> {
        let (sort, sorter) = match (&options.sorter, &options.sort) {
            (Some(sorter), _) => (None, Some(sorter.clone())),
            (None, Some(spec)) => (Some(spec.clone()), Some(compile_sort(spec)?)),
            (None, None) => (None, None),
        };
        Ok(Self {
            selector,
            matcher,
            sort,
            sorter,
            skip: options.skip,
            limit: Some(options.limit).filter(|n| *n > 0),
            ids,
        })
    }

    pub fn selector(&self) -> Option<&Value> {
        self.selector.as_ref()
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn sorter(&self) -> Option<&Sorter> {
        self.sorter.as_ref()
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The ids the selector is restricted to, when it names them.
    pub fn ids(&self) -> Option<&[DocId]> {
        self.ids.as_deref()
    }

    /// Whether skip or limit cut the results, so a single write can move
    /// documents across the window edges.
    pub fn is_limited(&self) -> bool {
        self.skip > 0 || self.limit.is_some()
    }

    /// Compares two documents by the query's sort; everything ties without one.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        match &self.sorter {
            Some(sorter) => sorter.compare(a, b),
            None => Ordering::Equal,
        }
    }

    /// Canonical key of two queries that produce identical result streams.
    ///
    /// `None` for queries built from closures, which never compare equal.
    pub fn dedup_key(&self, ordered: bool) -> Option<String> {
        let selector = self.selector.clone()?;
        if self.sorter.is_some() && self.sort.is_none() {
            return None;
        }
        let key = Value::Array(vec![
            selector,
            self.sort.clone().unwrap_or(Value::Null),
            Value::from(self.skip as f64),
            self.limit.map_or(Value::Null, |n| Value::from(n as f64)),
            Value::Bool(ordered),
        ]);
        Some(key.canonical_key())
    }

    /// Returns true if both queries were built from deep-equal selectors and
    /// sorts with the same skip and limit. Closure-built queries never match.
    pub fn same_query(&self, other: &QuerySpec) -> bool {
        let selectors = match (&self.selector, &other.selector) {
            (Some(a), Some(b)) => values_equal(a, b),
            _ => false,
        };
        let sorts = match (&self.sort, &other.sort) {
            (Some(a), Some(b)) => values_equal(a, b),
            (None, None) => self.sorter.is_none() && other.sorter.is_none(),
            _ => false,
        };
        selectors && sorts && self.skip == other.skip && self.limit == other.limit
    }

    /// Runs the query: match, sort (stable, so ties keep natural order),
    /// then skip and limit.
    pub fn fetch(&self, docs: &IndexMap<DocId, Document>) -> Vec<Document> {
        let mut results: Vec<Document> = candidates(docs, self.ids())
            .into_iter()
            .filter(|doc| self.matcher.matches(doc))
            .cloned()
            .collect();
        if let Some(sorter) = &self.sorter {
            results.sort_by(|a, b| sorter.compare(a, b));
        }
        results
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// The documents a scan has to look at, in natural (insertion) order.
pub(crate) fn candidates<'a>(docs: &'a IndexMap<DocId, Document>, ids: Option<&[DocId]>) -> Vec<&'a Document> {
    match ids {
        None => docs.values().collect(),
        Some(ids) => {
            let mut found: Vec<(usize, &Document)> = ids
                .iter()
                .filter_map(|id| docs.get_full(id).map(|(index, _, doc)| (index, doc)))
                .collect();
            found.sort_by_key(|(index, _)| *index);
            found.dedup_by_key(|(index, _)| *index);
            found.into_iter().map(|(_, doc)| doc).collect()
        }
    }
}

/// An observed query whose results the collection keeps up to date.
pub(crate) struct LiveQuery {
    pub(crate) spec: QuerySpec,
    pub(crate) ordered: bool,
    pub(crate) results: Vec<Document>,
    /// Results as of `pause_observers`, diffed against on resume.
    pub(crate) snapshot: Option<Vec<Document>>,
    pub(crate) observer: Rc<dyn ObserveChanges>,
    pub(crate) active: Rc<Cell<bool>>,
}

impl LiveQuery {
    pub(crate) fn pending(&self, events: ChangeBatch) -> PendingEvents {
        PendingEvents {
            observer: self.observer.clone(),
            active: self.active.clone(),
            events,
        }
    }

    fn position(&self, id: &DocId) -> Option<usize> {
        self.results.iter().position(|doc| doc.id().as_ref() == Some(id))
    }

    pub(crate) fn on_insert(&mut self, doc: &Document, docs: &IndexMap<DocId, Document>, log: &ChangeLog) {
        if !self.spec.matcher.matches(doc) {
            return;
        }
        if self.spec.is_limited() {
            self.recompute(docs, log);
        } else {
            self.insert_result(doc, log);
        }
    }

    pub(crate) fn on_update(
        &mut self,
        old: &Document,
        new: &Document,
        docs: &IndexMap<DocId, Document>,
        log: &ChangeLog,
    ) {
        let was_in = self.spec.matcher.matches(old);
        let is_in = self.spec.matcher.matches(new);
        if self.spec.is_limited() {
            if was_in || is_in {
                self.recompute(docs, log);
            }
            return;
        }
        match (was_in, is_in) {
            (true, true) => self.update_result(new, log),
            (false, true) => self.insert_result(new, log),
            (true, false) => self.remove_result(old, log),
            (false, false) => {}
        }
    }

    pub(crate) fn on_remove(&mut self, doc: &Document, docs: &IndexMap<DocId, Document>, log: &ChangeLog) {
        if !self.spec.matcher.matches(doc) {
            return;
        }
        if self.spec.is_limited() {
            self.recompute(docs, log);
        } else {
            self.remove_result(doc, log);
        }
    }

    /// Re-runs the query and diffs the new results against the old ones.
    pub(crate) fn recompute(&mut self, docs: &IndexMap<DocId, Document>, log: &ChangeLog) {
        let new_results = self.spec.fetch(docs);
        diff_query_changes(self.ordered, &self.results, &new_results, log);
        self.results = new_results;
    }

    fn insert_result(&mut self, doc: &Document, log: &ChangeLog) {
        let id = match doc.id() {
            Some(id) => id,
            None => return,
        };
        let fields = doc.without_id();
        if !self.ordered {
            self.results.push(doc.clone());
            log.added(&id, &fields);
            return;
        }
        let index = match &self.spec.sorter {
            Some(sorter) => insert_in_sorted(&mut self.results, doc.clone(), |a, b| sorter.compare(a, b)),
            None => {
                self.results.push(doc.clone());
                self.results.len() - 1
            }
        };
        let before = self.results.get(index + 1).and_then(Document::id);
        log.added_before(&id, &fields, before.as_ref());
    }

    fn remove_result(&mut self, doc: &Document, log: &ChangeLog) {
        let id = match doc.id() {
            Some(id) => id,
            None => return,
        };
        if let Some(index) = self.position(&id) {
            self.results.remove(index);
            log.removed(&id);
        }
    }

    fn update_result(&mut self, new: &Document, log: &ChangeLog) {
        let id = match new.id() {
            Some(id) => id,
            None => return,
        };
        let index = match self.position(&id) {
            Some(index) => index,
            None => return self.insert_result(new, log),
        };

        let fields = make_changed_fields(new, &self.results[index]);
        if !fields.is_empty() {
            log.changed(&id, &fields);
        }

        if !self.ordered || self.still_in_place(index, new) {
            self.results[index] = new.clone();
            return;
        }

        self.results.remove(index);
        let spec = &self.spec;
        let new_index = insert_in_sorted(&mut self.results, new.clone(), |a, b| spec.compare(a, b));
        if new_index != index {
            let before = self.results.get(new_index + 1).and_then(Document::id);
            log.moved_before(&id, before.as_ref());
        }
    }

    /// Whether `doc` still sorts between the neighbours of slot `index`.
    fn still_in_place(&self, index: usize, doc: &Document) -> bool {
        let after_prev = index == 0 || self.spec.compare(&self.results[index - 1], doc) != Ordering::Greater;
        let before_next = self
            .results
            .get(index + 1)
            .map_or(true, |next| self.spec.compare(doc, next) != Ordering::Greater);
        after_prev && before_next
    }
}

/// Events waiting to be delivered to one observer.
pub(crate) struct PendingEvents {
    observer: Rc<dyn ObserveChanges>,
    active: Rc<Cell<bool>>,
    events: ChangeBatch,
}

impl PendingEvents {
    /// Delivers the events in order, stopping as soon as the observer is
    /// stopped (possibly by one of these very callbacks).
    pub(crate) fn deliver(self) {
        for event in &self.events {
            if !self.active.get() {
                break;
            }
            event.deliver(self.observer.as_ref());
        }
    }
}
