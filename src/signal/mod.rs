//! Cooperative cancellation signals.
//!
//! # Data Flow
//! ```text
//! Timer thread:
//!     Request::enforce → ContextHandle::deliver (store kind, unpark, notify)
//!
//! Guarded code (the signalled context):
//!     checkpoint()            → Err(DeadlineExceeded) once
//!     sleep(d)                → wakes early with Err(DeadlineExceeded)
//!     ContextHandle::cancelled().await → resolves with the SignalKind
//! ```
//!
//! # Design Decisions
//! - No preemption: guarded code observes the signal at its own safe points
//! - A delivered signal is consumed exactly once by whoever takes it
//! - Each thread has one implicit context; futures get detached ones

pub mod context;
pub mod kind;

pub use context::{checkpoint, sleep, ContextHandle, ContextId};
pub use kind::SignalKind;
