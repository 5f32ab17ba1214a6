//! Router-level tests for the admission gate.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;

use rate_governor::config::GovernorConfig;
use rate_governor::identity::RateKey;
use rate_governor::limiter::{AdmissionDecision, ManualClock};
use rate_governor::policy::EndpointCategory;
use rate_governor::store::{StoreError, WindowEntry, WindowStore};

mod common;
use common::{anonymous, bearer, header, json_body, Harness, MEMBER_TOKEN, STAFF_TOKEN, START_MS};

struct OfflineStore;

impl WindowStore for OfflineStore {
    fn get_or_create(
        &self,
        _key: &RateKey,
        _category: EndpointCategory,
        _update: &mut dyn FnMut(&mut WindowEntry) -> AdmissionDecision,
    ) -> Result<AdmissionDecision, StoreError> {
        Err(StoreError::Unavailable("backing store offline".into()))
    }

    fn prune(&self, _now_ms: u64) -> usize {
        0
    }

    fn len(&self) -> usize {
        0
    }
}

struct PanickingStore;

impl WindowStore for PanickingStore {
    fn get_or_create(
        &self,
        _key: &RateKey,
        _category: EndpointCategory,
        _update: &mut dyn FnMut(&mut WindowEntry) -> AdmissionDecision,
    ) -> Result<AdmissionDecision, StoreError> {
        panic!("replica lost mid-update")
    }

    fn prune(&self, _now_ms: u64) -> usize {
        0
    }

    fn len(&self) -> usize {
        0
    }
}

async fn explode() -> StatusCode {
    panic!("handler exploded")
}

async fn stall() -> &'static str {
    tokio::time::sleep(Duration::from_secs(60)).await;
    "late"
}

#[tokio::test]
async fn test_login_quota_exhaustion() {
    let harness = Harness::new(&GovernorConfig::default());
    let router = harness.router();

    for expected_remaining in ["4", "3", "2", "1", "0"] {
        let response = router
            .clone()
            .oneshot(anonymous("POST", "/auth/login", "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-ratelimit-limit"), Some("5"));
        assert_eq!(header(&response, "x-ratelimit-remaining"), Some(expected_remaining));
        assert_eq!(header(&response, "x-ratelimit-reset"), Some("1900"));
    }

    let response = router
        .clone()
        .oneshot(anonymous("POST", "/auth/login", "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "retry-after"), Some("900"));
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("5"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("0"));
    assert_eq!(header(&response, "x-ratelimit-reset"), Some("1900"));

    let body = json_body(response).await;
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["resetTime"], START_MS + 15 * 60 * 1000);
    assert!(body["message"].as_str().unwrap().contains("login"));

    // Another client is unaffected.
    let response = router
        .clone()
        .oneshot(anonymous("POST", "/auth/login", "203.0.113.10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // After the window the first client starts over.
    harness.clock.advance(Duration::from_secs(15 * 60));
    let response = router
        .oneshot(anonymous("POST", "/auth/login", "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("4"));
}

#[tokio::test]
async fn test_categories_are_counted_separately() {
    let harness = Harness::new(&GovernorConfig::default());
    let router = harness.router();

    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(anonymous("POST", "/auth/signup", "198.51.100.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = router
        .clone()
        .oneshot(anonymous("POST", "/auth/signup", "198.51.100.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = router
        .oneshot(anonymous("POST", "/auth/login", "198.51.100.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("4"));
}

#[tokio::test]
async fn test_admin_gets_admin_quota_on_user_routes() {
    let harness = Harness::new(&GovernorConfig::default());
    let router = harness.router();

    let response = router
        .clone()
        .oneshot(bearer("GET", "/me/courses", STAFF_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("500"));
    let body = json_body(response).await;
    assert_eq!(body["key"], "user:7");
    assert_eq!(body["tier"], "admin");

    let response = router
        .oneshot(bearer("GET", "/me/courses", MEMBER_TOKEN))
        .await
        .unwrap();
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("200"));
    let body = json_body(response).await;
    assert_eq!(body["key"], "user:42");
    assert_eq!(body["tier"], "user");
}

#[tokio::test]
async fn test_forged_token_is_counted_as_anonymous() {
    let harness = Harness::new(&GovernorConfig::default());
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/courses")
        .header("authorization", "Bearer forged")
        .header("x-forwarded-for", "192.0.2.33")
        .header("user-agent", "curl/8.5")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = harness.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("100"));
    let body = json_body(response).await;
    assert_eq!(body["key"], "192.0.2.33|curl/8.5");
    assert_eq!(body["tier"], "anonymous");
}

#[tokio::test]
async fn test_handler_errors_still_carry_quota_headers() {
    let harness = Harness::new(&GovernorConfig::default());
    let router = harness.admission.protect(
        EndpointCategory::User,
        Router::new().route("/me/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR })),
    );

    let response = router
        .oneshot(bearer("GET", "/me/broken", MEMBER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("200"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("199"));
}

#[tokio::test]
async fn test_panicking_handler_still_carries_quota_headers() {
    let harness = Harness::new(&GovernorConfig::default());
    let router = harness.admission.protect(
        EndpointCategory::User,
        Router::new().route("/me/explode", get(explode)),
    );

    let response = router
        .oneshot(bearer("GET", "/me/explode", MEMBER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("200"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("199"));
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_handler_still_carries_quota_headers() {
    let mut config = GovernorConfig::default();
    config.listener.request_timeout_secs = 1;
    let harness = Harness::new(&config);
    let router = harness.admission.protect(
        EndpointCategory::User,
        Router::new().route("/me/stall", get(stall)),
    );

    let response = router
        .oneshot(bearer("GET", "/me/stall", MEMBER_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("200"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("199"));
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn test_store_panic_fails_open() {
    let config = GovernorConfig::default();
    let admission =
        Harness::admission_over(&config, Arc::new(PanickingStore), ManualClock::new(START_MS));
    let router = rate_governor::GovernorServer::build_router(&config, &admission);

    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(anonymous("POST", "/auth/login", "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(header(&response, "x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_store_outage_fails_open() {
    let config = GovernorConfig::default();
    let admission =
        Harness::admission_over(&config, Arc::new(OfflineStore), ManualClock::new(START_MS));
    let router = rate_governor::GovernorServer::build_router(&config, &admission);

    for _ in 0..10 {
        let response = router
            .clone()
            .oneshot(anonymous("POST", "/auth/login", "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(header(&response, "x-ratelimit-limit").is_none());
        assert!(header(&response, "x-ratelimit-remaining").is_none());
    }
}

#[tokio::test]
async fn test_disabled_category_is_unrestricted() {
    let harness = Harness::from_toml(
        r#"
        [policies.public]
        enabled = false
        "#,
    );
    let router = harness.router();

    for _ in 0..150 {
        let response = router
            .clone()
            .oneshot(anonymous("GET", "/courses", "192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(header(&response, "x-ratelimit-limit").is_none());
    }
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn test_sliding_log_policy_from_config() {
    let harness = Harness::from_toml(
        r#"
        [policies.password-reset]
        algorithm = "sliding_log"
        window_ms = 10000
        max_requests = 2
        "#,
    );
    let router = harness.router();
    let send = || router.clone().oneshot(anonymous("POST", "/auth/password-reset", "192.0.2.2"));

    assert_eq!(send().await.unwrap().status(), StatusCode::OK);
    harness.clock.advance(Duration::from_secs(6));
    assert_eq!(send().await.unwrap().status(), StatusCode::OK);

    let response = send().await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    // The oldest entry leaves the log at START + 10s, four seconds from now.
    assert_eq!(header(&response, "retry-after"), Some("4"));

    harness.clock.advance(Duration::from_secs(4));
    let response = send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("0"));
}

#[tokio::test]
async fn test_token_bucket_policy_from_config() {
    let harness = Harness::from_toml(
        r#"
        [policies.sensitive]
        algorithm = "token_bucket"
        capacity = 2
        refill_per_second = 1.0
        "#,
    );
    let router = harness.router();
    let send = || router.clone().oneshot(bearer("POST", "/analytics/events", MEMBER_TOKEN));

    let response = send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("2"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("1"));
    assert_eq!(send().await.unwrap().status(), StatusCode::OK);

    let response = send().await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "retry-after"), Some("1"));

    harness.clock.advance(Duration::from_secs(1));
    assert_eq!(send().await.unwrap().status(), StatusCode::OK);
    assert_eq!(send().await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_prune_drops_lapsed_windows_only() {
    let harness = Harness::new(&GovernorConfig::default());
    let router = harness.router();

    router
        .clone()
        .oneshot(anonymous("POST", "/auth/login", "192.0.2.3"))
        .await
        .unwrap();
    harness.clock.advance(Duration::from_secs(60));
    router
        .clone()
        .oneshot(anonymous("GET", "/courses", "192.0.2.3"))
        .await
        .unwrap();
    assert_eq!(harness.store.len(), 2);

    // The login window lapses at +900s, the public one at +960s.
    harness.clock.advance(Duration::from_secs(841));
    assert_eq!(harness.admission.limiter().prune(), 1);
    assert_eq!(harness.store.len(), 1);

    harness.clock.advance(Duration::from_secs(60));
    assert_eq!(harness.admission.limiter().prune(), 1);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn test_health_is_not_limited() {
    let harness = Harness::new(&GovernorConfig::default());
    let router = harness.router();
    for _ in 0..200 {
        let response = router
            .clone()
            .oneshot(anonymous("GET", "/health", "192.0.2.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert!(harness.store.is_empty());
}
