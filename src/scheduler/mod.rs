//! Deadline scheduling engine.
//!
//! # Data Flow
//! ```text
//! Caller thread:
//!     RequestScheduler::enqueue
//!         → OrderedStore::insert (+ ThreadIndex via StoreObserver)
//!         → new nearest? SchedulerObserver::nearest_changed → Timer::wake_at
//!
//! Timer thread:
//!     armed instant reached → on_expiry callback
//!         → RequestScheduler::process_expired
//!             → Request::enforce (at most one signal per context)
//!             → drop defused front requests
//!             → SchedulerObserver::nearest_changed → Timer::wake_at
//! ```
//!
//! # Design Decisions
//! - Exactly one background thread per engine, whatever the number of requests
//! - Lock order is scheduler → timer; the timer never calls out while locked
//! - defuse/enforce race is settled by the per-request lock

pub mod request;
pub mod request_scheduler;
pub mod timer;

pub use request::{Request, RequestHandle, RequestState};
pub use request_scheduler::{RequestScheduler, SchedulerObserver};
pub use timer::Timer;
