//! Result set diffing.
//!
//! Turns two versions of a query's results into the observer calls that
//! transform one into the other. Documents are matched by `_id`; fields are
//! compared with deep equality.
//!
//! The ordered diff keeps a longest increasing subsequence of old positions
//! in place and emits as few `moved_before` calls as that allows.

use crate::fields::make_changed_fields;
use crate::observer::ObserveChanges;
use alloc::vec::Vec;
use docket_core::{DocId, Document};
use hashbrown::{HashMap, HashSet};

/// Pairs each document with its id, dropping documents without a usable `_id`.
fn with_ids(docs: &[Document]) -> Vec<(DocId, &Document)> {
    docs.iter()
        .filter_map(|doc| match doc.id() {
            Some(id) => Some((id, doc)),
            None => {
                log::warn!("ignoring result document without a valid _id");
                None
            }
        })
        .collect()
}

/// Diffs two result sets, ordered or not.
pub fn diff_query_changes(
    ordered: bool,
    old_results: &[Document],
    new_results: &[Document],
    observer: &dyn ObserveChanges,
) {
    if ordered {
        diff_query_ordered_changes(old_results, new_results, observer);
    } else {
        diff_query_unordered_changes(old_results, new_results, observer);
    }
}

/// Diffs two unordered result sets.
///
/// Emits `changed` and `added` in `new_results` order, then `removed` in
/// `old_results` order.
pub fn diff_query_unordered_changes(
    old_results: &[Document],
    new_results: &[Document],
    observer: &dyn ObserveChanges,
) {
    let old = with_ids(old_results);
    let new = with_ids(new_results);
    let old_by_id: HashMap<&DocId, &Document> = old.iter().map(|(id, doc)| (id, *doc)).collect();
    let new_by_id: HashMap<&DocId, &Document> = new.iter().map(|(id, doc)| (id, *doc)).collect();

    for (id, new_doc) in &new {
        match old_by_id.get(id) {
            Some(old_doc) => {
                let fields = make_changed_fields(new_doc, old_doc);
                if !fields.is_empty() {
                    observer.changed(id, &fields);
                }
            }
            None => observer.added(id, &new_doc.without_id()),
        }
    }

    for (id, _) in &old {
        if !new_by_id.contains_key(id) {
            observer.removed(id);
        }
    }
}

/// Diffs two ordered result sets.
///
/// Removals come first. New documents are then walked in groups, each group
/// ending at a document that keeps its relative position (the last group ends
/// at the end of the list). Within a group, new documents are added and
/// displaced ones report their field changes and move, all before the
/// group's anchor; the anchor then reports its own field changes.
pub fn diff_query_ordered_changes(
    old_results: &[Document],
    new_results: &[Document],
    observer: &dyn ObserveChanges,
) {
    let old = with_ids(old_results);
    let new = with_ids(new_results);

    let old_index_of_id: HashMap<&DocId, usize> =
        old.iter().enumerate().map(|(i, (id, _))| (id, i)).collect();
    let new_presence: HashSet<&DocId> = new.iter().map(|(id, _)| id).collect();

    let old_idx: Vec<Option<usize>> = new
        .iter()
        .map(|(id, _)| old_index_of_id.get(id).copied())
        .collect();
    let mut unmoved = longest_increasing_run(&old_idx);
    unmoved.push(new.len());

    for (id, _) in &old {
        if !new_presence.contains(id) {
            observer.removed(id);
        }
    }

    let mut start = 0;
    for end in unmoved {
        let group_id = new.get(end).map(|(id, _)| id);

        for i in start..end {
            let (id, new_doc) = &new[i];
            match old_idx[i] {
                None => observer.added_before(id, &new_doc.without_id(), group_id),
                Some(oi) => {
                    let fields = make_changed_fields(new_doc, old[oi].1);
                    if !fields.is_empty() {
                        observer.changed(id, &fields);
                    }
                    observer.moved_before(id, group_id);
                }
            }
        }

        if let (Some(id), Some(oi)) = (group_id, old_idx.get(end).copied().flatten()) {
            let fields = make_changed_fields(new[end].1, old[oi].1);
            if !fields.is_empty() {
                observer.changed(id, &fields);
            }
        }

        start = end + 1;
    }
}

/// Returns the positions (in increasing order) of a longest strictly
/// increasing subsequence of the present entries.
fn longest_increasing_run(seq: &[Option<usize>]) -> Vec<usize> {
    // seq_ends[j]: position ending the best run of length j + 1 found so far.
    let mut seq_ends: Vec<usize> = Vec::new();
    let mut ptrs: Vec<Option<usize>> = alloc::vec![None; seq.len()];

    for (i, value) in seq.iter().enumerate() {
        let value = match value {
            Some(v) => *v,
            None => continue,
        };
        let mut j = seq_ends.len();
        while j > 0 {
            let prev = seq[seq_ends[j - 1]].unwrap_or(0);
            if prev < value {
                break;
            }
            j -= 1;
        }
        ptrs[i] = if j == 0 { None } else { Some(seq_ends[j - 1]) };
        if j == seq_ends.len() {
            seq_ends.push(i);
        } else {
            seq_ends[j] = i;
        }
    }

    let mut run = Vec::with_capacity(seq_ends.len());
    let mut idx = seq_ends.last().copied();
    while let Some(i) = idx {
        run.push(i);
        idx = ptrs[i];
    }
    run.reverse();
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChangeEvent, ChangeLog};
    use alloc::string::String;
    use alloc::vec;
    use docket_core::{Value, ID_FIELD};

    fn docs(ids: &[&str]) -> Vec<Document> {
        ids.iter()
            .map(|id| {
                let mut d = Document::new();
                d.insert(ID_FIELD, Value::from(*id));
                d
            })
            .collect()
    }

    #[test]
    fn test_lis() {
        assert_eq!(longest_increasing_run(&[]), Vec::<usize>::new());
        assert_eq!(
            longest_increasing_run(&[Some(4), Some(0), Some(1), Some(2), Some(3)]),
            vec![1, 2, 3, 4]
        );
        assert_eq!(longest_increasing_run(&[None, Some(2), None, Some(1)]), vec![3]);
    }

    #[test]
    fn test_identical_results_emit_nothing() {
        let log = ChangeLog::new(true);
        let a = docs(&["a", "b", "c"]);
        diff_query_ordered_changes(&a, &a.clone(), &log);
        diff_query_unordered_changes(&a, &a.clone(), &log);
        assert!(log.is_empty());
    }

    #[test]
    fn test_single_move_to_front() {
        let log = ChangeLog::new(true);
        let old = docs(&["a", "b", "c", "d", "e"]);
        let new = docs(&["e", "a", "b", "c", "d"]);
        diff_query_ordered_changes(&old, &new, &log);

        assert_eq!(
            log.take(),
            vec![ChangeEvent::MovedBefore {
                id: DocId::from("e"),
                before: Some(DocId::from("a")),
            }]
        );
    }

    #[test]
    fn test_add_remove_and_change() {
        let log = ChangeLog::new(true);
        let old = docs(&["a", "b"]);
        let mut new = docs(&["b", "c"]);
        new[0].insert("x", Value::from(1));
        diff_query_ordered_changes(&old, &new, &log);

        assert_eq!(
            log.take(),
            vec![
                ChangeEvent::Removed { id: DocId::from("a") },
                ChangeEvent::Changed {
                    id: DocId::from("b"),
                    fields: vec![(String::from("x"), Some(Value::from(1)))],
                },
                ChangeEvent::AddedBefore {
                    id: DocId::from("c"),
                    fields: Document::new(),
                    before: None,
                },
            ]
        );
    }

    #[test]
    fn test_unordered_diff() {
        let log = ChangeLog::new(false);
        let old = docs(&["a", "b"]);
        let new = docs(&["c", "b"]);
        diff_query_unordered_changes(&old, &new, &log);

        assert_eq!(
            log.take(),
            vec![
                ChangeEvent::Added { id: DocId::from("c"), fields: Document::new() },
                ChangeEvent::Removed { id: DocId::from("a") },
            ]
        );
    }

    #[test]
    fn test_docs_without_ids_are_ignored() {
        let log = ChangeLog::new(true);
        let mut new = docs(&["a"]);
        new.push(Document::new());
        diff_query_ordered_changes(&[], &new, &log);
        assert_eq!(log.len(), 1);
    }
}
