//! Limit policy table.
//!
//! Maps every [`EndpointCategory`] to the parameters of the limiter that
//! guards it. Built once at startup from the built-in defaults and the
//! `[policies]` config section; read-only afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::schema::{PoliciesConfig, PolicyConfig};
use crate::policy::EndpointCategory;

const MINUTE_MS: u64 = 60 * 1000;

/// Built-in window and quota for each category.
pub const fn default_limits(category: EndpointCategory) -> (u64, u32) {
    match category {
        EndpointCategory::Login => (15 * MINUTE_MS, 5),
        EndpointCategory::Signup => (60 * MINUTE_MS, 3),
        EndpointCategory::PasswordReset => (60 * MINUTE_MS, 3),
        EndpointCategory::SocialAuth => (15 * MINUTE_MS, 10),
        EndpointCategory::Public => (15 * MINUTE_MS, 100),
        EndpointCategory::User => (15 * MINUTE_MS, 200),
        EndpointCategory::Sensitive => (60 * MINUTE_MS, 10),
        EndpointCategory::Admin => (15 * MINUTE_MS, 500),
    }
}

/// Limiter strategy selected by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    FixedWindow,
    SlidingLog,
    TokenBucket,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::FixedWindow => "fixed_window",
            Algorithm::SlidingLog => "sliding_log",
            Algorithm::TokenBucket => "token_bucket",
        }
    }
}

/// Invalid limiter parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("window must be positive, got {0} ms")]
    NonPositiveWindow(i64),

    #[error("quota must not be negative, got {0}")]
    NegativeQuota(i64),

    #[error("quota {0} exceeds the supported maximum")]
    QuotaTooLarge(i64),

    #[error("refill rate must be a positive finite number, got {0}")]
    InvalidRefillRate(f64),
}

/// Immutable limiter parameters for one category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitPolicy {
    FixedWindow { window_ms: u64, max_requests: u32 },
    SlidingLog { window_ms: u64, max_requests: u32 },
    TokenBucket { capacity: u32, refill_per_second: f64 },
}

impl LimitPolicy {
    pub fn fixed_window(window_ms: u64, max_requests: u32) -> Result<Self, PolicyError> {
        check_window(window_ms as i64)?;
        Ok(LimitPolicy::FixedWindow {
            window_ms,
            max_requests,
        })
    }

    pub fn sliding_log(window_ms: u64, max_requests: u32) -> Result<Self, PolicyError> {
        check_window(window_ms as i64)?;
        Ok(LimitPolicy::SlidingLog {
            window_ms,
            max_requests,
        })
    }

    pub fn token_bucket(capacity: u32, refill_per_second: f64) -> Result<Self, PolicyError> {
        let usable = refill_per_second.is_finite()
            && (refill_per_second > 0.0 || (capacity == 0 && refill_per_second == 0.0));
        if !usable {
            return Err(PolicyError::InvalidRefillRate(refill_per_second));
        }
        Ok(LimitPolicy::TokenBucket {
            capacity,
            refill_per_second,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            LimitPolicy::FixedWindow { .. } => Algorithm::FixedWindow,
            LimitPolicy::SlidingLog { .. } => Algorithm::SlidingLog,
            LimitPolicy::TokenBucket { .. } => Algorithm::TokenBucket,
        }
    }

    /// Quota (or bucket capacity) advertised in `X-RateLimit-Limit`.
    pub fn limit(&self) -> u32 {
        match self {
            LimitPolicy::FixedWindow { max_requests, .. }
            | LimitPolicy::SlidingLog { max_requests, .. } => *max_requests,
            LimitPolicy::TokenBucket { capacity, .. } => *capacity,
        }
    }

    /// Resolve one `[policies.<category>]` entry against the defaults.
    pub fn from_config(category: EndpointCategory, config: &PolicyConfig) -> Result<Self, PolicyError> {
        let (default_window, default_quota) = default_limits(category);
        // A window is checked even when the token bucket ends up not using it.
        let window_ms = check_window(config.window_ms.unwrap_or(default_window as i64))?;
        let max_requests = to_quota(config.max_requests.unwrap_or(default_quota as i64))?;

        match config.algorithm {
            Algorithm::FixedWindow => LimitPolicy::fixed_window(window_ms, max_requests),
            Algorithm::SlidingLog => LimitPolicy::sliding_log(window_ms, max_requests),
            Algorithm::TokenBucket => {
                let capacity = match config.capacity {
                    Some(capacity) => to_quota(capacity)?,
                    None => max_requests,
                };
                let refill_per_second = match config.refill_per_second {
                    Some(rate) => rate,
                    None => max_requests as f64 / (window_ms as f64 / 1000.0),
                };
                LimitPolicy::token_bucket(capacity, refill_per_second)
            }
        }
    }
}

fn check_window(window_ms: i64) -> Result<u64, PolicyError> {
    if window_ms <= 0 {
        return Err(PolicyError::NonPositiveWindow(window_ms));
    }
    Ok(window_ms as u64)
}

fn to_quota(value: i64) -> Result<u32, PolicyError> {
    if value < 0 {
        return Err(PolicyError::NegativeQuota(value));
    }
    u32::try_from(value).map_err(|_| PolicyError::QuotaTooLarge(value))
}

/// Category → policy lookup.
///
/// A category without an entry is unrestricted. That only happens when an
/// operator disables it explicitly with `enabled = false`.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<EndpointCategory, LimitPolicy>,
}

impl PolicyTable {
    /// Fixed-window policies for every category, using [`default_limits`].
    pub fn defaults() -> Self {
        let policies = EndpointCategory::ALL
            .into_iter()
            .map(|category| {
                let (window_ms, max_requests) = default_limits(category);
                (
                    category,
                    LimitPolicy::FixedWindow {
                        window_ms,
                        max_requests,
                    },
                )
            })
            .collect();
        Self { policies }
    }

    /// Build the table from config, collecting every invalid entry.
    pub fn from_config(
        config: &PoliciesConfig,
    ) -> Result<Self, Vec<(EndpointCategory, PolicyError)>> {
        let mut table = Self::defaults();
        let mut errors = Vec::new();

        for (category, entry) in config {
            if !entry.enabled {
                table.policies.remove(category);
                continue;
            }
            match LimitPolicy::from_config(*category, entry) {
                Ok(policy) => {
                    table.policies.insert(*category, policy);
                }
                Err(e) => errors.push((*category, e)),
            }
        }

        if errors.is_empty() {
            Ok(table)
        } else {
            Err(errors)
        }
    }

    pub fn get(&self, category: EndpointCategory) -> Option<&LimitPolicy> {
        self.policies.get(&category)
    }

    /// Replace the policy of one category.
    pub fn with_policy(mut self, category: EndpointCategory, policy: LimitPolicy) -> Self {
        self.policies.insert(category, policy);
        self
    }

    /// Leave one category unrestricted.
    pub fn without(mut self, category: EndpointCategory) -> Self {
        self.policies.remove(&category);
        self
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::defaults()
    }
}
