//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define client metrics (requests, latency, retries, endpoint health)
//! - Expose a Prometheus-compatible endpoint when a binary asks for one
//!
//! # Metrics
//! - `docdb_requests_total` (counter): completed calls by verb, status
//! - `docdb_request_duration_seconds` (histogram): end-to-end call latency
//! - `docdb_retries_total` (counter): retries by strategy
//! - `docdb_endpoint_unavailable_total` (counter): endpoints marked unavailable, by host
//!
//! # Design Decisions
//! - Labels stay low-cardinality: no resource ids, no activity ids, and
//!   endpoints are labelled by host only (one per region)
//! - Status label is "error" for failures with no HTTP status

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;
use url::Url;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

/// Record one finished call (all attempts included).
pub fn record_request(verb: &str, status: Option<u16>, started: Instant) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    metrics::counter!(
        "docdb_requests_total",
        "verb" => verb.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("docdb_request_duration_seconds", "verb" => verb.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_retry(strategy: &'static str) {
    metrics::counter!("docdb_retries_total", "strategy" => strategy).increment(1);
}

pub fn record_endpoint_unavailable(endpoint: &Url) {
    let host = endpoint_host(endpoint);
    metrics::counter!("docdb_endpoint_unavailable_total", "host" => host).increment(1);
}

fn endpoint_host(endpoint: &Url) -> String {
    match (endpoint.host_str(), endpoint.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => "unknown".to_string(),
    }
}
