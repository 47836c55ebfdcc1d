//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fetchgate_requests_total` (counter): handled requests by status
//! - `fetchgate_request_duration_seconds` (histogram): handler latency
//! - `fetchgate_admission_rejected_total` (counter): requests refused with 503
//! - `fetchgate_in_flight_requests` (gauge): admitted requests being handled
//! - `fetchgate_fetches_total` (counter): outbound fetches by outcome

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("fetchgate_requests_total", "status" => status.to_string()).increment(1);
    histogram!("fetchgate_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_admission_rejected() {
    counter!("fetchgate_admission_rejected_total").increment(1);
}

pub fn set_in_flight(count: usize) {
    gauge!("fetchgate_in_flight_requests").set(count as f64);
}

/// Outcome is one of `success`, `error`, `timeout`.
pub fn record_fetch(outcome: &'static str) {
    counter!("fetchgate_fetches_total", "outcome" => outcome).increment(1);
}
