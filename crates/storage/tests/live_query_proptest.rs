//! Property-based tests for live queries.
//!
//! A replica maintained only from observer callbacks must always equal a
//! fresh fetch of the same query, whatever sequence of writes is applied.

use docket_core::{compare_values, doc, value, DocId, Document, Value};
use docket_incremental::{ChangeCallbacks, ObserveCallbacks};
use docket_storage::{Collection, FindOptions, UpdateOptions};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Clone, Debug)]
enum Op {
    Insert { id: u8, a: i32 },
    Update { from: i32, to: i32, multi: bool },
    Inc { min: i32 },
    Remove { a: i32 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..12, 0i32..6).prop_map(|(id, a)| Op::Insert { id, a }),
        2 => (0i32..6, 0i32..6, any::<bool>()).prop_map(|(from, to, multi)| Op::Update { from, to, multi }),
        1 => (0i32..6).prop_map(|min| Op::Inc { min }),
        1 => (0i32..6).prop_map(|a| Op::Remove { a }),
    ]
}

fn apply(c: &Collection, op: &Op) {
    match op {
        Op::Insert { id, a } => {
            // Duplicate ids are rejected and leave the collection as it was.
            let _ = c.insert(doc!({"_id": (format!("id{}", id)), "a": a}));
        }
        Op::Update { from, to, multi } => {
            let options = if *multi { UpdateOptions::new().multi() } else { UpdateOptions::new() };
            c.update(&value!({"a": from}), &value!({"$set": {"a": to}}), options).unwrap();
        }
        Op::Inc { min } => {
            c.update(
                &value!({"a": {"$gte": min}}),
                &value!({"$inc": {"a": 1}}),
                UpdateOptions::new().multi(),
            )
            .unwrap();
        }
        Op::Remove { a } => {
            c.remove(&value!({"a": a})).unwrap();
        }
    }
}

fn ordered_replica(replica: &Rc<RefCell<Vec<Document>>>) -> ObserveCallbacks {
    let (r1, r2, r3, r4) = (replica.clone(), replica.clone(), replica.clone(), replica.clone());
    ObserveCallbacks::new()
        .on_added_at(move |doc, index, _| r1.borrow_mut().insert(index, doc.clone()))
        .on_changed_at(move |doc, _, index| r2.borrow_mut()[index] = doc.clone())
        .on_moved_to(move |_, from, to, _| {
            let mut docs = r3.borrow_mut();
            let doc = docs.remove(from);
            docs.insert(to, doc);
        })
        .on_removed_at(move |_, index| {
            r4.borrow_mut().remove(index);
        })
}

fn ids(docs: &[Document]) -> Vec<DocId> {
    docs.iter().filter_map(Document::id).collect()
}

proptest! {
    /// Property: an ordered replica equals the fetched results after every write.
    #[test]
    fn prop_ordered_replica_matches_fetch(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let c = Collection::new("prop");
        let cursor = c
            .find(&value!({"a": {"$lt": 5}}), FindOptions::new().sort(value!({"a": 1, "_id": 1})))
            .unwrap();
        let replica = Rc::new(RefCell::new(Vec::new()));
        let _handle = cursor.observe(ordered_replica(&replica)).unwrap();

        for op in &ops {
            apply(&c, op);
            prop_assert_eq!(&*replica.borrow(), &cursor.fetch());
        }
    }

    /// Property: skip and limit windows are kept up to date as documents
    /// move in and out of them.
    #[test]
    fn prop_limited_replica_matches_fetch(
        ops in prop::collection::vec(op_strategy(), 1..40),
        skip in 0usize..3,
        limit in 1usize..4,
    ) {
        let c = Collection::new("prop");
        let options = FindOptions::new().sort(value!({"a": -1, "_id": 1})).skip(skip).limit(limit);
        let cursor = c.find(&value!({}), options).unwrap();
        let replica = Rc::new(RefCell::new(Vec::new()));
        let _handle = cursor.observe(ordered_replica(&replica)).unwrap();

        for op in &ops {
            apply(&c, op);
            prop_assert_eq!(&*replica.borrow(), &cursor.fetch());
        }
    }

    /// Property: an unordered replica holds the same documents as the results.
    #[test]
    fn prop_unordered_replica_matches_fetch(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let c = Collection::new("prop");
        let cursor = c.find(&value!({"a": {"$in": [1, 2, 3]}}), FindOptions::new()).unwrap();
        let replica: Rc<RefCell<BTreeMap<String, Document>>> = Rc::new(RefCell::new(BTreeMap::new()));
        let (r1, r2, r3) = (replica.clone(), replica.clone(), replica.clone());
        let callbacks = ChangeCallbacks::new()
            .on_added(move |id, fields| {
                r1.borrow_mut().insert(id.to_string(), Document::with_id(id, fields));
            })
            .on_changed(move |id, fields| {
                if let Some(doc) = r2.borrow_mut().get_mut(&id.to_string()) {
                    docket_incremental::apply_changes(doc, fields);
                }
            })
            .on_removed(move |id| {
                r3.borrow_mut().remove(&id.to_string());
            });
        let _handle = cursor.observe_changes(callbacks).unwrap();

        for op in &ops {
            apply(&c, op);
            let expected: BTreeMap<String, Document> = cursor
                .fetch()
                .into_iter()
                .filter_map(|d| d.id().map(|id| (id.to_string(), d)))
                .collect();
            prop_assert_eq!(&*replica.borrow(), &expected);
        }
    }

    /// Property: fetch returns exactly the matching documents, in sort order.
    #[test]
    fn prop_fetch_filters_and_sorts(ops in prop::collection::vec(op_strategy(), 1..40), min in 0i32..6) {
        let c = Collection::new("prop");
        for op in &ops {
            apply(&c, op);
        }
        let results = c
            .find(&value!({"a": {"$gte": min}}), FindOptions::new().sort(value!({"a": -1})))
            .unwrap()
            .fetch();

        let all = c.find(&value!({}), FindOptions::new()).unwrap().fetch();
        let mut expected: Vec<DocId> = all
            .iter()
            .filter(|d| d.get("a").and_then(Value::as_f64).map_or(false, |a| a >= min as f64))
            .filter_map(Document::id)
            .collect();
        let mut actual = ids(&results);
        let sorted_desc = results.windows(2).all(|w| {
            compare_values(w[0].get("a"), w[1].get("a")) != std::cmp::Ordering::Less
        });
        prop_assert!(sorted_desc);
        expected.sort();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }
}
