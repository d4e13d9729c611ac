//! Frugal deadlines: per-call timeouts served by a single background thread.
//!
//! A caller registers a deadline; if the deadline passes before the caller
//! defuses it, the caller's execution context receives exactly one
//! cancellation signal. Any number of pending deadlines share one timer
//! thread.
//!
//! Cancellation is cooperative: guarded code observes the signal through
//! [`checkpoint`], [`sleep`] or [`ContextHandle::cancelled`].

pub mod config;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod observability;
pub mod queue;
pub mod scheduler;
pub mod signal;
pub mod time;

pub use config::EngineConfig;
pub use error::{DeadlineExceeded, EngineError, Error};
pub use guard::{timeout, timeout_future, timeout_with};
pub use lifecycle::Engine;
pub use scheduler::{Request, RequestHandle, RequestScheduler, RequestState, SchedulerObserver, Timer};
pub use signal::{checkpoint, sleep, ContextHandle, ContextId, SignalKind};
