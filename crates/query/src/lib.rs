//! Docket Query - Selector matching and sort ordering for Docket.
//!
//! This crate compiles the two query inputs a cursor is built from:
//!
//! - `selector`: Mongo-style selectors compiled into a reusable [`Matcher`]
//! - `sort`: sort specifications compiled into a [`Sorter`]
//! - `lookup`: dotted-path lookup with array branching, shared by both
//! - `regexp`: regex compilation with JavaScript flag letters
//!
//! # Example
//!
//! ```rust
//! use docket_core::{doc, value};
//! use docket_query::{compile_selector, compile_sort};
//!
//! let matcher = compile_selector(&value!({"tags": "red", "n": {"$gt": 2}})).unwrap();
//! assert!(matcher.matches(&doc!({"tags": ["blue", "red"], "n": 3})));
//! assert!(!matcher.matches(&doc!({"tags": ["blue"], "n": 3})));
//!
//! let sorter = compile_sort(&value!({"n": -1})).unwrap();
//! let a = doc!({"n": 1});
//! let b = doc!({"n": 2});
//! assert_eq!(sorter.compare(&a, &b), std::cmp::Ordering::Greater);
//! ```

pub mod lookup;
pub mod regexp;
pub mod selector;
pub mod sort;

pub use selector::{
    compile_document_selector, compile_selector, compile_value_matcher, ids_matched_by_selector, selector_is_id,
    selector_is_id_perhaps_as_object, Matcher,
};
pub use sort::{compile_sort, insert_in_sorted, sorted_insert_index, SortOrder, Sorter};
