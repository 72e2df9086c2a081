//! Sort specification compiler.
//!
//! Accepted forms:
//!
//! ```text
//! {"a": 1, "b": -1}
//! ["a", ["b", "desc"]]
//! [["a", "asc"], ["b", "desc"]]
//! ```
//!
//! A key whose path reaches several values (through arrays) sorts by the
//! smallest of them when ascending and by the largest when descending.
//! Arrays are expanded one level; an empty array counts as a missing value.

use crate::lookup::lookup_document;
use docket_core::{compare_values, Document, Error, Result, Value};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Sort direction of one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SortKey {
    path: String,
    order: SortOrder,
}

enum SorterKind {
    Keys(Vec<SortKey>),
    Custom(Box<dyn Fn(&Document, &Document) -> Ordering>),
}

/// A compiled comparator over documents.
#[derive(Clone)]
pub struct Sorter {
    kind: Rc<SorterKind>,
}

impl Sorter {
    /// A comparator from a plain function.
    pub fn from_fn<F>(cmp: F) -> Self
    where
        F: Fn(&Document, &Document) -> Ordering + 'static,
    {
        Self {
            kind: Rc::new(SorterKind::Custom(Box::new(cmp))),
        }
    }

    /// Compares two documents.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        match self.kind.as_ref() {
            SorterKind::Custom(cmp) => cmp(a, b),
            SorterKind::Keys(keys) => {
                for key in keys {
                    let left = reduce_branches(a, key);
                    let right = reduce_branches(b, key);
                    let ord = compare_values(left, right);
                    let ord = match key.order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            }
        }
    }

    /// Returns the (path, order) pairs, empty for custom comparators.
    pub fn keys(&self) -> Vec<(&str, SortOrder)> {
        match self.kind.as_ref() {
            SorterKind::Keys(keys) => keys.iter().map(|k| (k.path.as_str(), k.order)).collect(),
            SorterKind::Custom(_) => Vec::new(),
        }
    }
}

impl fmt::Debug for Sorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            SorterKind::Keys(keys) => f.debug_tuple("Sorter").field(keys).finish(),
            SorterKind::Custom(_) => f.write_str("Sorter(<fn>)"),
        }
    }
}

/// Picks the value a document sorts by for one key.
fn reduce_branches<'a>(doc: &'a Document, key: &SortKey) -> Option<&'a Value> {
    let mut reduced: Option<Option<&'a Value>> = None;
    for branch in lookup_document(doc, &key.path) {
        let candidates: Vec<Option<&'a Value>> = match branch {
            Some(Value::Array(items)) if items.is_empty() => vec![None],
            Some(Value::Array(items)) => items.iter().map(Some).collect(),
            other => vec![other],
        };
        for candidate in candidates {
            reduced = Some(match reduced {
                None => candidate,
                Some(current) => {
                    let ord = compare_values(current, candidate);
                    let replace = match key.order {
                        SortOrder::Asc => ord == Ordering::Greater,
                        SortOrder::Desc => ord == Ordering::Less,
                    };
                    if replace {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
    }
    reduced.flatten()
}

/// Compiles a sort specification.
pub fn compile_sort(spec: &Value) -> Result<Sorter> {
    let keys = match spec {
        Value::Object(fields) => fields
            .iter()
            .map(|(path, dir)| Ok(SortKey { path: check_path(path)?, order: object_order(dir)? }))
            .collect::<Result<Vec<_>>>()?,
        Value::Array(items) => items
            .iter()
            .map(array_key)
            .collect::<Result<Vec<_>>>()?,
        other => {
            return Err(Error::sort(format!("Bad sort specification: {:?}", other)));
        }
    };
    log::trace!("compiled sort with {} keys", keys.len());
    Ok(Sorter {
        kind: Rc::new(SorterKind::Keys(keys)),
    })
}

fn check_path(path: &str) -> Result<String> {
    if path.is_empty() || path.starts_with('$') || path.split('.').any(str::is_empty) {
        return Err(Error::sort(format!("Bad sort key: {:?}", path)));
    }
    Ok(path.to_string())
}

fn object_order(dir: &Value) -> Result<SortOrder> {
    match dir {
        Value::Number(n) if *n < 0.0 => Ok(SortOrder::Desc),
        Value::Number(_) => Ok(SortOrder::Asc),
        Value::String(s) => named_order(s),
        other => Err(Error::sort(format!("Bad sort direction: {:?}", other))),
    }
}

fn named_order(name: &str) -> Result<SortOrder> {
    match name {
        "asc" | "ascending" => Ok(SortOrder::Asc),
        "desc" | "descending" => Ok(SortOrder::Desc),
        other => Err(Error::sort(format!("Bad sort direction: {:?}", other))),
    }
}

fn array_key(item: &Value) -> Result<SortKey> {
    match item {
        Value::String(path) => Ok(SortKey {
            path: check_path(path)?,
            order: SortOrder::Asc,
        }),
        Value::Array(pair) => match pair.as_slice() {
            [Value::String(path)] => Ok(SortKey {
                path: check_path(path)?,
                order: SortOrder::Asc,
            }),
            [Value::String(path), Value::String(dir)] => Ok(SortKey {
                path: check_path(path)?,
                order: named_order(dir)?,
            }),
            _ => Err(Error::sort(format!("Bad sort key: {:?}", item))),
        },
        other => Err(Error::sort(format!("Bad sort key: {:?}", other))),
    }
}

/// Position at which `item` goes into an already sorted slice: after every
/// element that does not compare greater than it.
pub fn sorted_insert_index<T>(items: &[T], item: &T, cmp: impl Fn(&T, &T) -> Ordering) -> usize {
    items.partition_point(|existing| cmp(existing, item) != Ordering::Greater)
}

/// Inserts `item` after all elements comparing equal to it and returns its index.
pub fn insert_in_sorted<T>(items: &mut Vec<T>, item: T, cmp: impl Fn(&T, &T) -> Ordering) -> usize {
    let idx = sorted_insert_index(items, &item, cmp);
    items.insert(idx, item);
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::{doc, value};

    fn cmp(spec: Value, a: Document, b: Document) -> Ordering {
        compile_sort(&spec).unwrap().compare(&a, &b)
    }

    #[test]
    fn test_sort_spec_forms() {
        assert!(compile_sort(&value!({"a": 1})).is_ok());
        assert!(compile_sort(&value!(["a", ["b", "desc"]])).is_ok());
        assert!(compile_sort(&value!([["a", "asc"], ["b", "desc"]])).is_ok());
        assert!(compile_sort(&value!("a")).is_err());
        assert!(compile_sort(&value!(1)).is_err());
        assert!(compile_sort(&value!({"": 1})).is_err());
        assert!(compile_sort(&value!({"$a": 1})).is_err());
        assert!(compile_sort(&value!([["a", "sideways"]])).is_err());

        let sorter = compile_sort(&value!(["a", ["b", "desc"]])).unwrap();
        assert_eq!(sorter.keys(), vec![("a", SortOrder::Asc), ("b", SortOrder::Desc)]);
    }

    #[test]
    fn test_empty_spec_is_stable() {
        assert_eq!(cmp(value!({}), doc!({"a": 1}), doc!({"a": 2})), Ordering::Equal);
    }

    #[test]
    fn test_basic_directions() {
        assert_eq!(cmp(value!({"a": 1}), doc!({"a": 1}), doc!({"a": 2})), Ordering::Less);
        assert_eq!(cmp(value!({"a": -1}), doc!({"a": 1}), doc!({"a": 2})), Ordering::Greater);
        assert_eq!(
            cmp(value!({"a": 1, "b": -1}), doc!({"a": 1, "b": 1}), doc!({"a": 1, "b": 2})),
            Ordering::Greater
        );
    }

    #[test]
    fn test_missing_sorts_first() {
        assert_eq!(cmp(value!({"a": 1}), doc!({}), doc!({"a": null})), Ordering::Less);
        assert_eq!(cmp(value!({"a": 1}), doc!({"a": null}), doc!({"a": 0})), Ordering::Less);
        assert_eq!(cmp(value!({"a": 1}), doc!({"a": []}), doc!({"a": null})), Ordering::Less);
    }

    #[test]
    fn test_array_keys_use_min_or_max() {
        // Ascending: [1, 10] sorts as 1, below 5.
        assert_eq!(cmp(value!({"a": 1}), doc!({"a": [1, 10]}), doc!({"a": 5})), Ordering::Less);
        // Descending: [1, 10] sorts as 10, above 5.
        assert_eq!(cmp(value!({"a": -1}), doc!({"a": [1, 10]}), doc!({"a": 5})), Ordering::Less);
        assert_eq!(
            cmp(value!({"a.b": 1}), doc!({"a": [{"b": 7}, {"b": 2}]}), doc!({"a": {"b": 3}})),
            Ordering::Less
        );
    }

    #[test]
    fn test_sorted_insert_index() {
        let items = vec![1, 3, 3, 5];
        assert_eq!(sorted_insert_index(&items, &0, |a, b| a.cmp(b)), 0);
        assert_eq!(sorted_insert_index(&items, &3, |a, b| a.cmp(b)), 3);
        assert_eq!(sorted_insert_index(&items, &9, |a, b| a.cmp(b)), 4);
        assert_eq!(sorted_insert_index(&[], &9, |a: &i32, b: &i32| a.cmp(b)), 0);

        let mut pairs = vec![(1, 'a'), (3, 'b')];
        let idx = insert_in_sorted(&mut pairs, (1, 'c'), |a, b| a.0.cmp(&b.0));
        assert_eq!(idx, 1);
        assert_eq!(pairs, vec![(1, 'a'), (1, 'c'), (3, 'b')]);
    }

    #[test]
    fn test_custom_sorter() {
        let sorter = Sorter::from_fn(|a, b| {
            let x = a.get("n").and_then(Value::as_f64).unwrap_or(0.0);
            let y = b.get("n").and_then(Value::as_f64).unwrap_or(0.0);
            y.partial_cmp(&x).unwrap_or(Ordering::Equal)
        });
        assert_eq!(sorter.compare(&doc!({"n": 1}), &doc!({"n": 2})), Ordering::Greater);
        assert!(sorter.keys().is_empty());
    }
}
