//! Deep equality and the cross-type total order.
//!
//! `compare_values` takes `Option<&Value>` so that a missing field
//! ("undefined") participates in ordering: it sorts before everything,
//! null included.

use crate::document::Document;
use crate::value::Value;
use alloc::vec::Vec;
use core::cmp::Ordering;

/// Deep structural equality.
///
/// Objects compare key by key in order; numbers compare numerically with
/// NaN equal to itself; values of different types are never equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => documents_equal(x, y),
        (Value::Binary(x), Value::Binary(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::ObjectId(x), Value::ObjectId(y)) => x == y,
        (Value::Regex(x), Value::Regex(y)) => x == y,
        (Value::Custom(x), Value::Custom(y)) => x.equals(y.as_ref()),
        _ => false,
    }
}

/// Key-order-sensitive document equality.
pub fn documents_equal(a: &Document, b: &Document) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
}

/// Compares two possibly-missing values in the cross-type total order.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_present(a, b),
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    let by_type = a.type_order().cmp(&b.type_order());
    if by_type != Ordering::Equal {
        return by_type;
    }

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_sequences(x, y),
        (Value::Binary(x), Value::Binary(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Value::ObjectId(x), Value::ObjectId(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Regex(x), Value::Regex(y)) => x
            .pattern
            .cmp(&y.pattern)
            .then_with(|| x.flags.cmp(&y.flags)),
        // Objects and custom values: compare as flattened [k1, v1, k2, v2, ...].
        _ => compare_sequences(&flatten_object(a), &flatten_object(b)),
    }
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = compare_present(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn flatten_object(value: &Value) -> Vec<Value> {
    let projected;
    let doc = match value {
        Value::Object(doc) => doc,
        Value::Custom(custom) => {
            projected = custom.to_json_value();
            match &projected {
                Value::Object(doc) => doc,
                other => return alloc::vec![other.clone()],
            }
        }
        other => return alloc::vec![other.clone()],
    };

    let mut flat = Vec::with_capacity(doc.len() * 2);
    for (k, v) in doc.iter() {
        flat.push(Value::from(k));
        flat.push(v.clone());
    }
    flat
}
