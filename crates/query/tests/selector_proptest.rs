//! Property-based tests for selector matching and sort ordering.

use docket_core::{compare_values, Document, Value};
use docket_query::{compile_selector, compile_sort};
use proptest::prelude::*;
use std::cmp::Ordering;

/// Strategy for scalar field values across several types.
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-50i32..50).prop_map(Value::from),
        "[a-d]{0,3}".prop_map(Value::from),
    ]
}

/// Strategy for a field value that may also be a short array.
fn field_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => value_strategy(),
        1 => prop::collection::vec(value_strategy(), 0..4).prop_map(Value::Array),
    ]
}

fn doc_strategy() -> impl Strategy<Value = Document> {
    prop::option::of(field_strategy()).prop_map(|a| {
        let mut doc = Document::new();
        if let Some(a) = a {
            doc.insert("a", a);
        }
        doc
    })
}

fn selector(op: &str, operand: Value) -> Value {
    let mut ops = Document::new();
    ops.insert(op, operand);
    let mut sel = Document::new();
    sel.insert("a", Value::Object(ops));
    Value::Object(sel)
}

proptest! {
    /// Property: $nin is the negation of $in.
    #[test]
    fn nin_negates_in(doc in doc_strategy(), list in prop::collection::vec(value_strategy(), 0..4)) {
        let in_m = compile_selector(&selector("$in", Value::Array(list.clone()))).unwrap();
        let nin_m = compile_selector(&selector("$nin", Value::Array(list))).unwrap();
        prop_assert_ne!(in_m.matches(&doc), nin_m.matches(&doc));
    }

    /// Property: $not inverts any operator it wraps on single-branch paths.
    #[test]
    fn not_inverts(doc in doc_strategy(), operand in value_strategy()) {
        let inner = selector("$gte", operand.clone());
        let mut wrapped = Document::new();
        wrapped.insert("$gte", operand);
        let negated = selector("$not", Value::Object(wrapped));
        let m = compile_selector(&inner).unwrap();
        let n = compile_selector(&negated).unwrap();
        prop_assert_ne!(m.matches(&doc), n.matches(&doc));
    }

    /// Property: $or of two selectors matches exactly when either does.
    #[test]
    fn or_is_disjunction(doc in doc_strategy(), x in value_strategy(), y in value_strategy()) {
        let left = selector("$lt", x);
        let right = selector("$gt", y);
        let mut or = Document::new();
        or.insert("$or", Value::Array(vec![left.clone(), right.clone()]));
        let expected = compile_selector(&left).unwrap().matches(&doc)
            || compile_selector(&right).unwrap().matches(&doc);
        prop_assert_eq!(compile_selector(&Value::Object(or)).unwrap().matches(&doc), expected);
    }

    /// Property: sorting by a scalar field agrees with the value order.
    #[test]
    fn sort_agrees_with_compare(a in value_strategy(), b in value_strategy()) {
        let sorter = compile_sort(&docket_core::value!({"a": 1})).unwrap();
        let mut da = Document::new();
        da.insert("a", a.clone());
        let mut db = Document::new();
        db.insert("a", b.clone());
        prop_assert_eq!(sorter.compare(&da, &db), compare_values(Some(&a), Some(&b)));
    }

    /// Property: a descending sort is the reverse of an ascending one on scalars.
    #[test]
    fn desc_reverses_asc(a in value_strategy(), b in value_strategy()) {
        let asc = compile_sort(&docket_core::value!({"a": 1})).unwrap();
        let desc = compile_sort(&docket_core::value!({"a": -1})).unwrap();
        let mut da = Document::new();
        da.insert("a", a);
        let mut db = Document::new();
        db.insert("a", b);
        prop_assert_eq!(asc.compare(&da, &db), desc.compare(&da, &db).reverse());
        prop_assert_eq!(asc.compare(&da, &da), Ordering::Equal);
    }
}
