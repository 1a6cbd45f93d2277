//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mas_requests_total` (counter): requests by operation, status
//! - `mas_request_duration_seconds` (histogram): latency by operation
//! - `mas_cache_events_total` (counter): hit, miss, bypass, lookup_error, store_error
//! - `mas_backend_errors_total` (counter): failed backend calls by operation
//!
//! Recording is a no-op until a recorder is installed by `init_metrics`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(operation: &str, status: u16, start: Instant) {
    metrics::counter!(
        "mas_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "mas_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_event(event: &'static str) {
    metrics::counter!("mas_cache_events_total", "event" => event).increment(1);
}

pub fn record_backend_error(operation: &'static str) {
    metrics::counter!("mas_backend_errors_total", "operation" => operation).increment(1);
}
