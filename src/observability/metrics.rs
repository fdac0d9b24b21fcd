//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wrr_selections_total` (counter): picks by server
//! - `wrr_no_available_server_total` (counter): picks that found no healthy server
//! - `wrr_status_changes_total` (counter): health flips by server, status
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Low-overhead metric updates (atomic operations)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::HealthStatus;

/// Install the Prometheus exporter and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_selection(server: &str) {
    ::metrics::counter!("wrr_selections_total", "server" => server.to_string()).increment(1);
}

pub fn record_no_available_server() {
    ::metrics::counter!("wrr_no_available_server_total").increment(1);
}

pub fn record_status_change(server: &str, healthy: bool) {
    ::metrics::counter!(
        "wrr_status_changes_total",
        "server" => server.to_string(),
        "status" => HealthStatus::from(healthy).to_string()
    )
    .increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}
