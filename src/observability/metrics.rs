//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency by method
//! - `gateway_rate_limited_total` (counter): rejections by limiter mode
//! - `gateway_auth_failures_total` (counter): rejections by error kind
//! - `gateway_circuit_transitions_total` (counter): by service, new state
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half_open, 2=open
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; exporting is opt-in
//! - Labels never carry user identifiers (bounded cardinality)

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(mode: &'static str) {
    counter!("gateway_rate_limited_total", "mode" => mode).increment(1);
}

pub fn record_auth_failure(kind: &'static str) {
    counter!("gateway_auth_failures_total", "kind" => kind).increment(1);
}

pub fn record_circuit_transition(service: &str, to: &'static str) {
    counter!(
        "gateway_circuit_transitions_total",
        "service" => service.to_string(),
        "state" => to
    )
    .increment(1);

    let level = match to {
        "open" => 2.0,
        "half_open" => 1.0,
        _ => 0.0,
    };
    gauge!("gateway_circuit_state", "service" => service.to_string()).set(level);
}
