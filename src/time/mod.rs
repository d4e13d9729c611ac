//! Monotonic time source.
//!
//! # Design Decisions
//! - Deadlines are `Instant`s, never wall-clock times
//! - The clock is injected so scheduling logic can be tested without sleeping

pub mod clock;

pub use clock::{measure, Clock, ManualClock, MonotonicClock};
