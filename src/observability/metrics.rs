//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define helper metrics (requests, latency, backend attempts, relayed bytes)
//! - Expose Prometheus-compatible metrics endpoint (diagnostics listener)
//!
//! # Metrics
//! - `s3_helper_requests_total` (counter): requests by method, status
//! - `s3_helper_request_duration_seconds` (histogram): time to response headers
//! - `s3_helper_backend_attempts_total` (counter): attempts by outcome
//! - `s3_helper_relay_bytes_total` (counter): body bytes streamed to clients
//! - `s3_helper_relay_failures_total` (counter): truncated bodies by reason
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so the forwarding
//!   path never depends on diagnostics being enabled
//! - Labels are low-cardinality; object keys never become labels

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "s3_helper_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "s3_helper_request_duration_seconds";
pub const BACKEND_ATTEMPTS_TOTAL: &str = "s3_helper_backend_attempts_total";
pub const RELAY_BYTES_TOTAL: &str = "s3_helper_relay_bytes_total";
pub const RELAY_FAILURES_TOTAL: &str = "s3_helper_relay_failures_total";

/// Install the Prometheus recorder and its HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Requests answered, by method and status");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "Time from request receipt to response headers"
    );
    describe_counter!(BACKEND_ATTEMPTS_TOTAL, "Backend attempts, by outcome");
    describe_counter!(RELAY_BYTES_TOTAL, "Body bytes streamed to clients");
    describe_counter!(RELAY_FAILURES_TOTAL, "Bodies truncated mid-stream, by reason");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start_time: Instant) {
    counter!(REQUESTS_TOTAL, "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(start_time.elapsed().as_secs_f64());
}

/// `outcome` is one of `success`, `timeout`, `error`.
pub fn record_attempt(outcome: &'static str) {
    counter!(BACKEND_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_relay_bytes(bytes: u64) {
    counter!(RELAY_BYTES_TOTAL).increment(bytes);
}

/// `reason` is `backend` (upstream read failed) or `client` (client went away).
pub fn record_relay_failure(reason: &'static str) {
    counter!(RELAY_FAILURES_TOTAL, "reason" => reason).increment(1);
}
