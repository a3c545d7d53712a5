//! Metrics collection and exposition.
//!
//! # Metrics
//! - `connscope_requests_total` (counter): probes by strategy and outcome
//! - `connscope_request_duration_seconds` (histogram): handler latency
//! - `connscope_mss_bytes` (histogram): reported MSS by source
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality enums only

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished probe request.
pub fn record_probe(strategy: &'static str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "connscope_requests_total",
        "strategy" => strategy,
        "outcome" => outcome
    )
    .increment(1);

    metrics::histogram!("connscope_request_duration_seconds", "strategy" => strategy)
        .record(start.elapsed().as_secs_f64());
}

/// Record a reported MSS value.
pub fn record_mss(source: &'static str, mss: u32) {
    metrics::histogram!("connscope_mss_bytes", "source" => source).record(f64::from(mss));
}
