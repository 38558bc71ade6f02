//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_admission_total` (counter): admission decisions by `decision`
//! - `gate_admission_buckets` (gauge): live admission buckets after a sweep
//! - `gate_auth_failures_total` (counter): rejected credentials by `reason`
//! - `gate_errors_total` (counter): error envelopes by `kind`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::errors::ErrorKind;

/// Install the Prometheus recorder and its scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    metrics::counter!("gate_admission_total", "decision" => decision).increment(1);
}

pub fn record_bucket_count(count: usize) {
    metrics::gauge!("gate_admission_buckets").set(count as f64);
}

pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!("gate_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_error(kind: ErrorKind) {
    metrics::counter!("gate_errors_total", "kind" => kind.as_str()).increment(1);
}
