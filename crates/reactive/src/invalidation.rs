//! Routing of write notifications to live result sets.
//!
//! A result set whose selector pins down its documents by `_id` only needs to
//! hear about writes to those ids. Every other result set hears about every
//! write to its collection.

use docket_core::DocId;
use hashbrown::HashMap;

/// Unique identifier of a live result set within its hub.
pub type SetId = u64;

/// Maps document ids to the live result sets a write to them may affect.
#[derive(Debug, Default)]
pub struct InvalidationIndex {
    /// Document id -> result sets constrained to it
    by_id: HashMap<DocId, Vec<SetId>>,
    /// Result sets that may contain any document
    unconstrained: Vec<SetId>,
    /// Result set -> the ids it was registered under
    registered: HashMap<SetId, Option<Vec<DocId>>>,
}

impl InvalidationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a result set under the ids its selector is restricted to,
    /// or as unconstrained.
    pub fn register(&mut self, set: SetId, ids: Option<&[DocId]>) {
        match ids {
            Some(ids) => {
                for id in ids {
                    let sets = self.by_id.entry(id.clone()).or_default();
                    if !sets.contains(&set) {
                        sets.push(set);
                    }
                }
            }
            None => self.unconstrained.push(set),
        }
        self.registered.insert(set, ids.map(<[DocId]>::to_vec));
    }

    /// Unregisters a result set. Returns false if it was not registered.
    pub fn unregister(&mut self, set: SetId) -> bool {
        match self.registered.remove(&set) {
            Some(Some(ids)) => {
                for id in ids {
                    if let Some(sets) = self.by_id.get_mut(&id) {
                        sets.retain(|s| *s != set);
                        if sets.is_empty() {
                            self.by_id.remove(&id);
                        }
                    }
                }
                true
            }
            Some(None) => {
                self.unconstrained.retain(|s| *s != set);
                true
            }
            None => false,
        }
    }

    /// Returns the result sets a write to `ids` may affect, in registration
    /// order (set ids are assigned increasingly).
    pub fn affected(&self, ids: &[DocId]) -> Vec<SetId> {
        let mut sets = self.unconstrained.clone();
        for id in ids {
            if let Some(constrained) = self.by_id.get(id) {
                sets.extend_from_slice(constrained);
            }
        }
        sets.sort_unstable();
        sets.dedup();
        sets
    }

    /// Returns the number of registered result sets.
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}
