//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;

use rate_governor::config::{parse_config, GovernorConfig};
use rate_governor::http::{Admission, GovernorServer};
use rate_governor::identity::StaticTokenVerifier;
use rate_governor::limiter::ManualClock;
use rate_governor::store::{MemoryWindowStore, WindowStore};

/// Epoch milliseconds the manual clock starts at.
pub const START_MS: u64 = 1_000_000;

/// Tokens known to every test harness.
pub const MEMBER_TOKEN: &str = "member-token";
pub const STAFF_TOKEN: &str = "staff-token";

pub struct Harness {
    pub admission: Arc<Admission>,
    pub clock: ManualClock,
    pub store: Arc<MemoryWindowStore>,
}

impl Harness {
    pub fn new(config: &GovernorConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryWindowStore::new()))
    }

    pub fn from_toml(toml: &str) -> Self {
        let config = parse_config(toml).unwrap();
        Self::new(&config)
    }

    pub fn with_store(config: &GovernorConfig, store: Arc<MemoryWindowStore>) -> Self {
        let clock = ManualClock::new(START_MS);
        let admission = Self::admission_over(config, store.clone(), clock.clone());
        Self {
            admission,
            clock,
            store,
        }
    }

    pub fn admission_over(
        config: &GovernorConfig,
        store: Arc<dyn WindowStore>,
        clock: ManualClock,
    ) -> Arc<Admission> {
        let verifier = StaticTokenVerifier::from_config(&config.identity.tokens)
            .with_token(MEMBER_TOKEN, "42", false)
            .with_token(STAFF_TOKEN, "7", true);
        Arc::new(Admission::from_config(config, Arc::new(verifier), store, Arc::new(clock)).unwrap())
    }

    pub fn router(&self) -> Router {
        GovernorServer::build_router(&GovernorConfig::default(), &self.admission)
    }
}

pub fn anonymous(method: &str, path: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("x-forwarded-for", ip)
        .header("user-agent", "integration-test")
        .body(Body::empty())
        .unwrap()
}

pub fn bearer(method: &str, path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
