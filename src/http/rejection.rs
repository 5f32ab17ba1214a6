//! Quota headers and the 429 response.

use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::limiter::AdmissionDecision;
use crate::policy::EndpointCategory;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Body of a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionBody {
    pub error: String,
    pub message: String,
    /// Epoch milliseconds at which the quota is restored.
    pub reset_time: u64,
}

/// Write `X-RateLimit-Limit`, `-Remaining` and `-Reset` (epoch seconds).
pub fn apply_quota_headers(headers: &mut HeaderMap, decision: &AdmissionDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(ceil_secs(decision.reset_at_ms)),
    );
}

/// Build the 429 response for a denied decision.
pub fn too_many_requests(
    category: EndpointCategory,
    decision: &AdmissionDecision,
    now_ms: u64,
) -> Response {
    let body = RejectionBody {
        error: "Too Many Requests".to_string(),
        message: message_for(category).to_string(),
        reset_time: decision.reset_at_ms,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    apply_quota_headers(headers, &AdmissionDecision { remaining: 0, ..*decision });
    headers.insert(
        header::RETRY_AFTER,
        HeaderValue::from(retry_after_secs(decision, now_ms)),
    );
    response
}

/// Whole seconds to wait, rounded up and never below one.
pub fn retry_after_secs(decision: &AdmissionDecision, now_ms: u64) -> u64 {
    ceil_secs(decision.retry_after_ms(now_ms)).max(1)
}

fn ceil_secs(ms: u64) -> u64 {
    ms.div_ceil(1000)
}

fn message_for(category: EndpointCategory) -> &'static str {
    match category {
        EndpointCategory::Login => "Too many login attempts. Please try again later.",
        EndpointCategory::Signup => "Too many accounts created from this client. Please try again later.",
        EndpointCategory::PasswordReset => "Too many password reset requests. Please try again later.",
        EndpointCategory::SocialAuth => "Too many social sign-in attempts. Please try again later.",
        EndpointCategory::Sensitive => "Too many requests to a sensitive endpoint. Please slow down.",
        EndpointCategory::Public | EndpointCategory::User | EndpointCategory::Admin => {
            "Too many requests. Please try again later."
        }
    }
}
