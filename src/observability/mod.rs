//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler / timer / signal delivery produce:
//!     → tracing events (structured fields: request, context, kind)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Prometheus recorder (rendered by the CLI)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers/recorders is the binary's job
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod logging;
pub mod metrics;
