//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Returns every error found,
//! not just the first; a config that fails here must stop startup.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GovernorConfig;
use crate::policy::{EndpointCategory, PolicyError, PolicyTable};

/// A single semantic defect in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("policy `{category}`: {source}")]
    Policy {
        category: EndpointCategory,
        #[source]
        source: PolicyError,
    },

    #[error("invalid listener.bind_address `{0}`")]
    BindAddress(String),

    #[error("invalid observability.metrics_address `{0}`")]
    MetricsAddress(String),

    #[error("store.prune_interval_secs must be positive")]
    PruneInterval,

    #[error("identity token for subject `{0}` is declared more than once")]
    DuplicateToken(String),

    #[error("identity token for subject `{0}` is empty")]
    EmptyToken(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GovernorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(policy_errors) = PolicyTable::from_config(&config.policies) {
        errors.extend(
            policy_errors
                .into_iter()
                .map(|(category, source)| ValidationError::Policy { category, source }),
        );
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.store.prune_interval_secs == 0 {
        errors.push(ValidationError::PruneInterval);
    }

    let mut seen = HashSet::new();
    for entry in &config.identity.tokens {
        if entry.token.is_empty() {
            errors.push(ValidationError::EmptyToken(entry.subject.clone()));
        } else if !seen.insert(entry.token.as_str()) {
            errors.push(ValidationError::DuplicateToken(entry.subject.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
