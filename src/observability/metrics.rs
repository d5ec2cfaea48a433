//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_config_updates_total` (counter): committed config writes by outcome
//! - `relay_pool_restarts_total` (counter): full teardown and rebuild cycles
//! - `relay_pool_builds_total` (counter): finished constructions by outcome
//!   (`ok`, `error`, `stale`)
//! - `relay_pool_build_duration_seconds` (histogram): construction latency
//! - `relay_live_proxies` (gauge): members of the live pool
//! - `relay_counters_opened_total` (counter): traffic counters handed out
//! - `relay_counters_pruned_total` (counter): counters dropped after retention
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so library code
//!   and tests call these helpers unconditionally

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(%addr, "Prometheus metrics exporter listening"),
        Err(e) => tracing::error!(%addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_config_update(outcome: &str) {
    counter!("relay_config_updates_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_pool_restart() {
    counter!("relay_pool_restarts_total").increment(1);
}

pub fn record_pool_build(outcome: &str, took: Duration) {
    counter!("relay_pool_builds_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("relay_pool_build_duration_seconds").record(took.as_secs_f64());
}

pub fn record_live_proxies(count: usize) {
    gauge!("relay_live_proxies").set(count as f64);
}

pub fn record_counter_opened() {
    counter!("relay_counters_opened_total").increment(1);
}

pub fn record_counters_pruned(count: usize) {
    counter!("relay_counters_pruned_total").increment(count as u64);
}
