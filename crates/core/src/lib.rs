//! Docket Core - Document values, ordering and errors for Docket.
//!
//! This crate provides the foundational types shared by every Docket crate:
//!
//! - `Value`: JSON-like values plus binary, dates, ObjectIds, regexes and custom types
//! - `Document`: an insertion-ordered field map
//! - `DocId`: the `_id` of a stored document
//! - `compare_values` / `values_equal`: the cross-type total order and deep equality
//! - `Error`: error types for every Docket operation
//!
//! # Example
//!
//! ```rust
//! use core::cmp::Ordering;
//! use docket_core::{compare_values, doc, value, Value};
//!
//! let d = doc!({"_id": "abc", "tags": ["a", "b"], "n": 3});
//! assert_eq!(d.id().unwrap(), "abc");
//! assert_eq!(d.get("n"), Some(&Value::Number(3.0)));
//!
//! // null < numbers < strings
//! assert_eq!(compare_values(Some(&value!(null)), Some(&value!(1))), Ordering::Less);
//! assert_eq!(compare_values(Some(&value!(1)), Some(&value!("1"))), Ordering::Less);
//! ```

#![no_std]

extern crate alloc;

mod compare;
mod document;
mod error;
mod id;
mod json;
mod value;

use alloc::rc::Rc;

pub use compare::{compare_values, documents_equal, values_equal};
pub use document::{Document, ID_FIELD};
pub use error::{Error, Result};
pub use id::DocId;
pub use value::{
    CustomValue, RegexValue, Value, TYPE_ARRAY, TYPE_BINARY, TYPE_BOOL, TYPE_DATE, TYPE_NULL,
    TYPE_NUMBER, TYPE_OBJECT, TYPE_OBJECT_ID, TYPE_REGEX, TYPE_STRING,
};

#[doc(hidden)]
pub use serde_json;

/// A read-boundary projection applied to documents handed to callers.
pub type Transform = Rc<dyn Fn(&Document) -> Document>;

/// Builds a `Value` from JSON syntax.
#[macro_export]
macro_rules! value {
    ($($json:tt)+) => {
        $crate::Value::from($crate::serde_json::json!($($json)+))
    };
}

/// Builds a `Document` from a JSON object literal.
///
/// Anything other than an object literal yields an empty document.
#[macro_export]
macro_rules! doc {
    ($($json:tt)+) => {
        $crate::Document::from_json($crate::serde_json::json!($($json)+)).unwrap_or_default()
    };
}
