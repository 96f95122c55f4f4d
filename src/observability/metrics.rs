//! Metrics collection and exposition.
//!
//! # Metrics
//! - `routing_selections_total` (counter): selections by group, outcome
//! - `routing_notifications_total` (counter): notifications by group, outcome
//! - `routing_invalidations_total` (counter): signals by group, reason
//! - `routing_available_destinations` (gauge): eligible nodes per group

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::destination::InvalidationReason;

/// Install the Prometheus recorder and its scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_selection(group: &str, found: bool) {
    let outcome = if found { "selected" } else { "empty" };
    ::metrics::counter!(
        "routing_selections_total",
        "group" => group.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_notification(group: &str, outcome: &'static str) {
    ::metrics::counter!(
        "routing_notifications_total",
        "group" => group.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_invalidation(group: &str, reason: InvalidationReason) {
    ::metrics::counter!(
        "routing_invalidations_total",
        "group" => group.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

pub fn record_available(group: &str, count: usize) {
    ::metrics::gauge!("routing_available_destinations", "group" => group.to_string())
        .set(count as f64);
}
