//! Metrics collection and exposition.
//!
//! # Metrics
//! - `warden_decisions_total` (counter): decisions by outcome
//! - `warden_decision_duration_seconds` (histogram): time spent deciding
//! - `warden_rule_set_events_total` (counter): reconciliation by provider,
//!   change kind and result
//! - `warden_rules_active` (gauge): rules in the current index
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Prometheus exposition is optional and served on its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record one finished decision.
pub fn record_decision(outcome: &'static str, start: Instant) {
    metrics::counter!("warden_decisions_total", "outcome" => outcome).increment(1);
    metrics::histogram!("warden_decision_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record one processed rule-set event.
pub fn record_rule_set_event(provider: &str, change: &'static str, result: &'static str) {
    metrics::counter!(
        "warden_rule_set_events_total",
        "provider" => provider.to_string(),
        "change" => change,
        "result" => result
    )
    .increment(1);
}

pub fn set_active_rules(count: usize) {
    metrics::gauge!("warden_rules_active").set(count as f64);
}
