//! Docket Storage - In-memory document collections for Docket.
//!
//! This crate provides the document store and its local live queries:
//!
//! - `Collection`: insert, update, remove and find over an insertion-ordered map
//! - `modify`: the `$set`/`$inc`/`$push`/... modifier engine
//! - `Cursor`: a reusable query with `fetch`, `observe` and `observe_changes`
//! - `Journal`: pre-images recorded between `save_originals` and `retrieve_originals`
//! - `random_id`: 17-character document ids
//!
//! Live queries are maintained incrementally on every write. Their events
//! are delivered through a per-collection queue once the write is applied,
//! so callbacks may read, write or stop handles freely.
//!
//! # Example
//!
//! ```rust
//! use docket_core::{doc, value};
//! use docket_incremental::ChangeCallbacks;
//! use docket_storage::{Collection, FindOptions, UpdateOptions};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let people = Collection::new("people");
//! people.insert(doc!({"_id": "ada", "age": 36})).unwrap();
//!
//! let changes = Rc::new(Cell::new(0));
//! let counter = changes.clone();
//! let handle = people
//!     .find(&value!({"age": {"$gt": 30}}), FindOptions::new())
//!     .unwrap()
//!     .observe_changes(ChangeCallbacks::new().on_changed(move |_, _| counter.set(counter.get() + 1)))
//!     .unwrap();
//!
//! people.update(&value!("ada"), &value!({"$inc": {"age": 1}}), UpdateOptions::new()).unwrap();
//! assert_eq!(changes.get(), 1);
//! handle.stop();
//! ```

pub mod collection;
pub mod cursor;
pub mod id;
pub mod journal;
pub mod modify;
pub mod options;
pub mod query;

pub use collection::{Collection, DispatchGuard, ListenerId, LocalObserveHandle, QueryId, WriteNotification};
pub use cursor::Cursor;
pub use id::{random_id, random_id_with, ID_LENGTH};
pub use journal::{Journal, JournalEntry, Originals};
pub use modify::modify;
pub use options::{CollectionOptions, FindOptions, ObserveOptions, UpdateOptions};
pub use query::QuerySpec;
