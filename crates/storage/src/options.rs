//! Option structs for collections, queries, updates and observers.

use docket_core::{Transform, Value};
use docket_query::Sorter;

/// Collection-wide settings.
#[derive(Clone, Default)]
pub struct CollectionOptions {
    /// Projection applied to documents handed out by reads and `observe`.
    pub transform: Option<Transform>,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Options of a `find`.
///
/// A `limit` of zero means no limit.
#[derive(Clone, Default)]
pub struct FindOptions {
    /// Sort specification, compiled when the cursor is created.
    pub sort: Option<Value>,
    /// A precompiled or custom comparator; takes precedence over `sort`.
    pub sorter: Option<Sorter>,
    pub skip: usize,
    pub limit: usize,
    /// Overrides the collection transform for this cursor.
    pub transform: Option<Transform>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, spec: Value) -> Self {
        self.sort = Some(spec);
        self
    }

    pub fn sort_by(mut self, sorter: Sorter) -> Self {
        self.sorter = Some(sorter);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}

/// Options of an `update`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Update every matching document instead of the first one.
    pub multi: bool,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

/// Options of an observe call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Skip the initial `added` calls for documents already in the results.
    pub suppress_initial: bool,
}

impl ObserveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress_initial(mut self) -> Self {
        self.suppress_initial = true;
        self
    }
}
