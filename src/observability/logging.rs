//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured filter

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init()
}
