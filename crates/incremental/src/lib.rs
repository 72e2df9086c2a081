//! Docket Incremental - Observer protocols and result set diffing for Docket.
//!
//! A live query reports how its result set evolves instead of handing out
//! fresh copies. This crate holds the pieces that do not depend on where the
//! results come from:
//!
//! - `ObserveChanges` / `Observe`: the two observer protocols, plus closure
//!   builders `ChangeCallbacks` and `ObserveCallbacks`
//! - `diff_query_ordered_changes` / `diff_query_unordered_changes`: turn two
//!   versions of a result set into observer calls
//! - `ChangeEvent` / `ChangeLog`: observer calls captured as data, so they can
//!   be produced under a borrow and delivered after it is released
//! - `IndexedObserver`: adapts id-based deltas to whole-document events
//!
//! # Example
//!
//! ```rust
//! use docket_core::doc;
//! use docket_incremental::{diff_query_ordered_changes, ChangeEvent, ChangeLog};
//!
//! let old = vec![doc!({"_id": "a"}), doc!({"_id": "b"})];
//! let new = vec![doc!({"_id": "b"}), doc!({"_id": "a"})];
//!
//! let log = ChangeLog::new(true);
//! diff_query_ordered_changes(&old, &new, &log);
//!
//! let events = log.take();
//! assert_eq!(events.len(), 1);
//! assert!(matches!(events[0], ChangeEvent::MovedBefore { .. }));
//! ```

#![no_std]

extern crate alloc;

pub mod diff;
pub mod events;
pub mod fields;
pub mod indexed;
pub mod observer;

pub use diff::{diff_query_changes, diff_query_ordered_changes, diff_query_unordered_changes};
pub use events::{ChangeBatch, ChangeEvent, ChangeLog};
pub use fields::{apply_changes, make_changed_fields, FieldChanges};
pub use indexed::IndexedObserver;
pub use observer::{ChangeCallbacks, Observe, ObserveCallbacks, ObserveChanges};
