//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): client requests by method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_module_calls_total` (counter): module hops by module, status
//! - `gateway_module_call_duration_seconds` (histogram): per-hop latency by module

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_module_call(module: &str, status: u16, elapsed: Duration) {
    counter!(
        "gateway_module_calls_total",
        "module" => module.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_module_call_duration_seconds", "module" => module.to_string())
        .record(elapsed.as_secs_f64());
}
