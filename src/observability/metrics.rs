//! Metrics collection and exposition.
//!
//! # Metrics
//! - `deadline_requests_enqueued_total` (counter)
//! - `deadline_requests_enforced_total` (counter): by signal kind
//! - `deadline_requests_discarded_total` (counter): expired or dropped without a signal
//! - `deadline_timer_fires_total` (counter)
//! - `deadline_pending_requests` (gauge)
//! - `deadline_enforce_lateness_seconds` (histogram): time between deadline and signal

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::signal::SignalKind;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

pub fn record_enqueued(pending: usize) {
    counter!("deadline_requests_enqueued_total").increment(1);
    record_pending(pending);
}

pub fn record_enforced(kind: SignalKind, lateness: Duration) {
    counter!("deadline_requests_enforced_total", "kind" => kind.as_str()).increment(1);
    histogram!("deadline_enforce_lateness_seconds").record(lateness.as_secs_f64());
}

pub fn record_discarded(count: usize) {
    if count > 0 {
        counter!("deadline_requests_discarded_total").increment(count as u64);
    }
}

pub fn record_pending(pending: usize) {
    gauge!("deadline_pending_requests").set(pending as f64);
}

pub fn record_timer_fire() {
    counter!("deadline_timer_fires_total").increment(1);
}
