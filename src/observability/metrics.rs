//! Metrics collection and exposition.
//!
//! # Metrics
//! - `leadgate_requests_total` (counter): requests by route, status
//! - `leadgate_request_duration_seconds` (histogram): latency distribution
//! - `leadgate_rate_limited_total` (counter): limiter rejections by route
//! - `leadgate_mail_attempts_total` (counter): provider attempts by outcome
//! - `leadgate_rate_store_errors_total` (counter): shared-store call failures

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %e, "Failed to install metrics exporter");
    } else {
        tracing::info!(address = %addr, "Metrics exporter listening");
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!(
        "leadgate_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("leadgate_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route: &'static str) {
    counter!("leadgate_rate_limited_total", "route" => route).increment(1);
}

pub fn record_store_error() {
    counter!("leadgate_rate_store_errors_total").increment(1);
}

pub fn record_mail_attempt(provider: &'static str, outcome: &'static str) {
    counter!(
        "leadgate_mail_attempts_total",
        "provider" => provider,
        "outcome" => outcome
    )
    .increment(1);
}
