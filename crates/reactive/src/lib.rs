//! Docket Reactive - Shared live queries, write fences and publishing for Docket.
//!
//! This crate turns collection writes into observer events for many
//! observers at once:
//!
//! - `LiveQueryHub`: deduplicates identical observes onto one `LiveResultSet`
//! - `InvalidationIndex`: routes writes to the result sets they may affect
//! - `PollingDriver`: re-runs a query and diffs its results, counting polls
//! - `WriteFence`: fires once every observer has processed the writes made under it
//! - `publish_cursor`: drives a `PublishSink` with added/changed/removed messages
//!
//! # Example
//!
//! ```rust
//! use docket_core::{doc, value};
//! use docket_incremental::ChangeCallbacks;
//! use docket_reactive::{LiveQueryHub, WriteFence};
//! use docket_storage::{Collection, FindOptions};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let flowers = Collection::new("flowers");
//! let hub = LiveQueryHub::new(&flowers);
//! let cursor = flowers.find(&value!({"tags": "flower"}), FindOptions::new()).unwrap();
//!
//! let seen = Rc::new(Cell::new(0));
//! let (s1, s2) = (seen.clone(), seen.clone());
//! let first = hub
//!     .observe_changes(&cursor, ChangeCallbacks::new().on_added(move |_, _| s1.set(s1.get() + 1)))
//!     .unwrap();
//! let second = hub
//!     .observe_changes(&cursor, ChangeCallbacks::new().on_added(move |_, _| s2.set(s2.get() + 1)))
//!     .unwrap();
//! assert_eq!(hub.live_result_set_count(), 1);
//!
//! let fence = WriteFence::new();
//! hub.with_write_fence(&fence, || flowers.insert(doc!({"tags": ["flower"]})).unwrap());
//! fence.arm().unwrap();
//! assert!(fence.is_fired());
//! assert_eq!(seen.get(), 2);
//! assert_eq!(first.poll_count(), 2);
//!
//! first.stop();
//! second.stop();
//! assert_eq!(hub.live_result_set_count(), 0);
//! ```

pub mod driver;
pub mod fence;
pub mod hub;
pub mod invalidation;
pub mod multiplexer;
pub mod publish;

pub use driver::PollingDriver;
pub use fence::{FenceWait, FenceWrite, WriteFence};
pub use hub::{LiveQueryHub, ObserveHandle};
pub use invalidation::{InvalidationIndex, SetId};
pub use multiplexer::{HandleId, LiveResultSet};
pub use publish::{publish_cursor, PublishSink};
