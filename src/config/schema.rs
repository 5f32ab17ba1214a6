//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the governor.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::policy::{Algorithm, EndpointCategory};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GovernorConfig {
    /// Listener configuration for the demo server.
    pub listener: ListenerConfig,

    /// Identity resolution settings.
    pub identity: IdentityConfig,

    /// Per-category policy overrides.
    pub policies: PoliciesConfig,

    /// Window store maintenance.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// How a caller identity is derived from request metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Read client addresses from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_forwarded_headers: bool,

    /// Use the socket peer address when no forwarded header is usable.
    pub fallback_to_peer_addr: bool,

    /// Bearer tokens accepted by the static verifier.
    pub tokens: Vec<StaticTokenConfig>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            trust_forwarded_headers: true,
            fallback_to_peer_addr: true,
            tokens: Vec::new(),
        }
    }
}

/// A single bearer token known to the static verifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticTokenConfig {
    pub token: String,
    pub subject: String,
    #[serde(default)]
    pub admin: bool,
}

/// `[policies.<category>]` tables keyed by category name.
pub type PoliciesConfig = BTreeMap<EndpointCategory, PolicyConfig>;

/// Override for one category. Unset fields fall back to the built-in table.
///
/// Numbers are signed so that negative values reach validation instead of
/// failing inside the TOML parser with a less useful message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// `false` leaves the category unrestricted.
    pub enabled: bool,

    pub algorithm: Algorithm,

    pub window_ms: Option<i64>,

    pub max_requests: Option<i64>,

    /// Token bucket only; defaults to `max_requests`.
    pub capacity: Option<i64>,

    /// Token bucket only; defaults to `max_requests / window`.
    pub refill_per_second: Option<f64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: Algorithm::default(),
            window_ms: None,
            max_requests: None,
            capacity: None,
            refill_per_second: None,
        }
    }
}

/// Window store maintenance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Interval between background prune passes, in seconds.
    pub prune_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prune_interval_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: GovernorConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.policies.is_empty());
        assert_eq!(config.store.prune_interval_secs, 60);
        assert!(config.identity.trust_forwarded_headers);
    }

    #[test]
    fn test_policy_sections_parse_by_category_name() {
        let raw = r#"
            [policies.password-reset]
            algorithm = "sliding_log"
            window_ms = 1800000

            [policies.public]
            algorithm = "token_bucket"
            capacity = 50
            refill_per_second = 2.5

            [[identity.tokens]]
            token = "t-1"
            subject = "42"
            admin = true
        "#;
        let config: GovernorConfig = toml::from_str(raw).unwrap();

        let reset = &config.policies[&EndpointCategory::PasswordReset];
        assert_eq!(reset.algorithm, Algorithm::SlidingLog);
        assert_eq!(reset.window_ms, Some(1_800_000));
        assert!(reset.enabled);

        let public = &config.policies[&EndpointCategory::Public];
        assert_eq!(public.capacity, Some(50));
        assert_eq!(public.refill_per_second, Some(2.5));

        assert_eq!(config.identity.tokens.len(), 1);
        assert!(config.identity.tokens[0].admin);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let raw = r#"
            [policies.logn]
            max_requests = 1
        "#;
        assert!(toml::from_str::<GovernorConfig>(raw).is_err());
    }
}
