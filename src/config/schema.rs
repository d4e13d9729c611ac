//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for a deadline engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Background timer thread settings.
    pub timer: TimerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Timer thread configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimerConfig {
    /// Name given to the timer thread (shows up in debuggers and panics).
    pub thread_name: String,

    /// Stack size of the timer thread in KiB. Platform default when unset.
    pub stack_size_kib: Option<usize>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            thread_name: "deadline-timer".to_string(),
            stack_size_kib: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Fallback log filter when `RUST_LOG` is not set.
    pub log_filter: String,

    /// Install a Prometheus recorder in the CLI.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "frugal_deadline=info".to_string(),
            metrics_enabled: false,
        }
    }
}
