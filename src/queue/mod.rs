//! Pending-request bookkeeping.
//!
//! # Data Flow
//! ```text
//! enqueue:
//!     → ordered_store.rs (front insert or append + mark unsorted)
//!     → StoreObserver::added → thread_index.rs (record context → request)
//!
//! expiry pass:
//!     → ordered_store.rs (sort if unsorted, pop expired prefix)
//!     → StoreObserver::removed → thread_index.rs (forget context → request)
//! ```
//!
//! # Design Decisions
//! - Sorting is deferred until someone needs the whole order
//! - The nearest item is always at the front, sorted or not
//! - The index never allocates for a context with a single pending request

pub mod ordered_store;
pub mod thread_index;

pub use ordered_store::{OrderedStore, StoreObserver};
pub use thread_index::{Slot, ThreadIndex};
