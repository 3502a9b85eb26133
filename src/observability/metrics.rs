//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): decisions by outcome and access level
//! - `gate_decision_duration_seconds` (histogram): gate latency incl. lookups
//! - `gate_lookup_failures_total` (counter): failed session/profile/subscription reads
//! - `gate_upstream_requests_total` (counter): forwarded requests by status
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are low-cardinality (no paths, no user ids)

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(outcome: &'static str, access: &'static str, start: Instant) {
    metrics::counter!("gate_decisions_total", "outcome" => outcome, "access" => access).increment(1);
    metrics::histogram!("gate_decision_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_lookup_failure(lookup: &'static str) {
    metrics::counter!("gate_lookup_failures_total", "lookup" => lookup).increment(1);
}

pub fn record_upstream(status: u16) {
    metrics::counter!("gate_upstream_requests_total", "status" => status.to_string()).increment(1);
}
