//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (Engine::start):
//!     Validate config → spawn timer thread → build scheduler → wire expiry callback
//!
//! Global (Engine::global / Engine::install):
//!     first caller initialises the process-wide engine exactly once
//!
//! Shutdown (Engine::shutdown / drop):
//!     stop timer thread → join → pending requests are never enforced
//! ```
//!
//! # Design Decisions
//! - The global engine lives for the rest of the process once created
//! - Tests build their own engines and shut them down explicitly

pub mod engine;

pub use engine::Engine;
