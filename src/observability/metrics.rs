//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rate_governor_decisions_total` (counter): by category, tier, outcome
//! - `rate_governor_store_faults_total` (counter): by category
//! - `rate_governor_store_records` (gauge): live records after the last prune
//! - `rate_governor_pruned_records_total` (counter)

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::policy::{EndpointCategory, Tier};

/// Outcome label for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Rejected,
    Unrestricted,
    FailedOpen,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Rejected => "rejected",
            Outcome::Unrestricted => "unrestricted",
            Outcome::FailedOpen => "failed_open",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_decision(category: EndpointCategory, tier: Tier, outcome: Outcome) {
    counter!(
        "rate_governor_decisions_total",
        "category" => category.as_str(),
        "tier" => tier.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_store_fault(category: EndpointCategory) {
    counter!("rate_governor_store_faults_total", "category" => category.as_str()).increment(1);
}

pub fn record_prune(removed: usize, remaining: usize) {
    counter!("rate_governor_pruned_records_total").increment(removed as u64);
    gauge!("rate_governor_store_records").set(remaining as f64);
}
