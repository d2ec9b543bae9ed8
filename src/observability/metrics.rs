//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route and status
//! - `gateway_rate_limited_total` (counter): denied admissions by route
//! - `gateway_cache_lookups_total` (counter): lookups by result (hit/miss)
//! - `gateway_cache_entries` (gauge): live cache entries after a sweep
//! - `gateway_rate_limit_keys` (gauge): tracked limiter keys after a sweep
//! - `gateway_pool_overflow_total` (counter): sessions built on exhaustion
//! - `gateway_pool_refresh_total` (counter): pool generation refreshes
//! - `gateway_resolutions_total` (counter): resolver calls by outcome
//! - `gateway_resolve_duration_seconds` (histogram): resolver latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route: &str) {
    counter!("gateway_rate_limited_total", "route" => route.to_string()).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("gateway_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("gateway_cache_entries").set(entries as f64);
}

pub fn record_rate_limit_keys(keys: usize) {
    gauge!("gateway_rate_limit_keys").set(keys as f64);
}

pub fn record_pool_overflow() {
    counter!("gateway_pool_overflow_total").increment(1);
}

pub fn record_pool_refresh() {
    counter!("gateway_pool_refresh_total").increment(1);
}

pub fn record_resolution(outcome: &'static str, start: Instant) {
    counter!("gateway_resolutions_total", "outcome" => outcome).increment(1);
    histogram!("gateway_resolve_duration_seconds").record(start.elapsed().as_secs_f64());
}
