//! Property-based tests for shared live queries.
//!
//! Every handle of a shared live result set must end up mirroring a fresh
//! fetch, however writes are batched between polls.

use docket_core::{doc, value, Document};
use docket_incremental::ObserveCallbacks;
use docket_reactive::{LiveQueryHub, WriteFence};
use docket_storage::{Collection, FindOptions, UpdateOptions};
use futures_util::FutureExt;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug)]
enum Op {
    Insert { id: u8, x: i32 },
    Set { id: u8, x: i32 },
    Remove { id: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0u8..10, 0i32..20).prop_map(|(id, x)| Op::Insert { id, x }),
        2 => (0u8..10, 0i32..20).prop_map(|(id, x)| Op::Set { id, x }),
        1 => (0u8..10).prop_map(|id| Op::Remove { id }),
    ]
}

fn apply(c: &Collection, op: &Op) {
    match op {
        Op::Insert { id, x } => {
            let _ = c.insert(doc!({"_id": (format!("id{}", id)), "x": x}));
        }
        Op::Set { id, x } => {
            c.update(&value!((format!("id{}", id))), &value!({"$set": {"x": x}}), UpdateOptions::new())
                .unwrap();
        }
        Op::Remove { id } => {
            c.remove(&value!((format!("id{}", id)))).unwrap();
        }
    }
}

fn replica() -> (Rc<RefCell<Vec<Document>>>, ObserveCallbacks) {
    let docs = Rc::new(RefCell::new(Vec::new()));
    let (d1, d2, d3, d4) = (docs.clone(), docs.clone(), docs.clone(), docs.clone());
    let callbacks = ObserveCallbacks::new()
        .on_added_at(move |doc, index, _| d1.borrow_mut().insert(index, doc.clone()))
        .on_changed_at(move |doc, _, index| d2.borrow_mut()[index] = doc.clone())
        .on_moved_to(move |_, from, to, _| {
            let mut docs = d3.borrow_mut();
            let doc = docs.remove(from);
            docs.insert(to, doc);
        })
        .on_removed_at(move |_, index| {
            d4.borrow_mut().remove(index);
        });
    (docs, callbacks)
}

proptest! {
    /// Property: after each fenced batch of writes, both handles of a shared
    /// result set equal the fetched results, and the fence has fired.
    #[test]
    fn prop_shared_replicas_match_fetch(
        batches in prop::collection::vec(prop::collection::vec(op_strategy(), 1..6), 1..10),
        suspend in any::<bool>(),
    ) {
        let c = Collection::new("prop");
        let hub = LiveQueryHub::new(&c);
        let cursor = c
            .find(&value!({"x": {"$lt": 15}}), FindOptions::new().sort(value!({"x": -1, "_id": 1})))
            .unwrap();
        let (first, first_callbacks) = replica();
        let (second, second_callbacks) = replica();
        let h1 = hub.observe(&cursor, first_callbacks).unwrap();
        let h2 = hub.observe(&cursor, second_callbacks).unwrap();
        prop_assert_eq!(hub.live_result_set_count(), 1);

        for batch in &batches {
            let fence = WriteFence::new();
            if suspend {
                hub.suspend_polling();
            }
            hub.with_write_fence(&fence, || {
                for op in batch {
                    apply(&c, op);
                }
            });
            let wait = fence.arm_and_wait().unwrap();
            if suspend {
                hub.resume_polling();
            }
            prop_assert_eq!(wait.now_or_never(), Some(()));

            let expected = cursor.fetch();
            prop_assert_eq!(&*first.borrow(), &expected);
            prop_assert_eq!(&*second.borrow(), &expected);
        }

        h1.stop();
        h2.stop();
        prop_assert_eq!(hub.live_result_set_count(), 0);
    }

    /// Property: a fence armed over writes made while polling is suspended
    /// fires once polling resumes, even if some handles stopped in between,
    /// and the surviving handle still mirrors a fresh fetch.
    #[test]
    fn prop_fence_fires_across_stops(
        ops in prop::collection::vec(op_strategy(), 1..8),
        stop_first in any::<bool>(),
        stop_limited in any::<bool>(),
    ) {
        let c = Collection::new("prop");
        let hub = LiveQueryHub::new(&c);
        let all = c.find(&value!({}), FindOptions::new().sort(value!({"_id": 1}))).unwrap();
        let limited = c
            .find(&value!({}), FindOptions::new().sort(value!({"x": 1, "_id": 1})).limit(3))
            .unwrap();
        let (first, first_callbacks) = replica();
        let (kept, kept_callbacks) = replica();
        let (_, limited_callbacks) = replica();
        let h1 = hub.observe(&all, first_callbacks).unwrap();
        let h2 = hub.observe(&all, kept_callbacks).unwrap();
        let h3 = hub.observe(&limited, limited_callbacks).unwrap();

        let fence = WriteFence::new();
        hub.suspend_polling();
        hub.with_write_fence(&fence, || {
            for op in &ops {
                apply(&c, op);
            }
        });
        if stop_first {
            h1.stop();
        }
        if stop_limited {
            h3.stop();
        }
        let wait = fence.arm_and_wait().unwrap();
        hub.resume_polling();
        prop_assert_eq!(wait.now_or_never(), Some(()));
        prop_assert_eq!(fence.outstanding_writes(), 0);

        let expected = all.fetch();
        prop_assert_eq!(&*kept.borrow(), &expected);
        if !stop_first {
            prop_assert_eq!(&*first.borrow(), &expected);
        }
        h1.stop();
        h2.stop();
        h3.stop();
        prop_assert_eq!(hub.live_result_set_count(), 0);
    }
}
