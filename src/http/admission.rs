//! Admission middleware.
//!
//! Resolves the caller, picks the effective policy, runs the limiter and
//! either short-circuits with a 429 or forwards to the handler and stamps the
//! quota headers on whatever it returns, error responses, timeouts and
//! panics included.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};

use crate::config::GovernorConfig;
use crate::http::rejection::{apply_quota_headers, too_many_requests};
use crate::identity::{CredentialVerifier, Identity, IdentityResolver};
use crate::limiter::{AdmissionDecision, Clock, RateLimiter};
use crate::observability::metrics::{self, Outcome};
use crate::policy::{EndpointCategory, PolicyTable};
use crate::store::{StoreError, WindowStore};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of evaluating one request against its policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No policy for the category.
    Unrestricted,
    Admitted(AdmissionDecision),
    Rejected(AdmissionDecision),
    /// The store failed; the request goes through without quota metadata.
    FailedOpen,
}

/// The admission component. Built once at startup and shared via `Arc`.
#[derive(Debug)]
pub struct Admission {
    resolver: IdentityResolver,
    policies: PolicyTable,
    limiter: RateLimiter,
    request_timeout: Duration,
}

impl Admission {
    pub fn new(resolver: IdentityResolver, policies: PolicyTable, limiter: RateLimiter) -> Self {
        Self {
            resolver,
            policies,
            limiter,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Deadline for a protected handler. A handler that overruns it still
    /// answers through the gate, as a 408 with quota headers.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Wire the component from validated config.
    ///
    /// Invalid policies have already been rejected by validation; any that
    /// slip through are reported here the same way.
    pub fn from_config(
        config: &GovernorConfig,
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, crate::config::ConfigError> {
        let policies = PolicyTable::from_config(&config.policies).map_err(|errors| {
            crate::config::ConfigError::Validation(
                errors
                    .into_iter()
                    .map(|(category, source)| crate::config::ValidationError::Policy {
                        category,
                        source,
                    })
                    .collect(),
            )
        })?;
        let resolver = IdentityResolver::from_config(&config.identity, verifier);
        Ok(Self::new(resolver, policies, RateLimiter::new(store, clock))
            .with_request_timeout(Duration::from_secs(config.listener.request_timeout_secs)))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Count one request from `identity` against `category`.
    pub fn evaluate(&self, identity: &Identity, category: EndpointCategory) -> Verdict {
        let effective = category.effective_for(identity.tier);
        let Some(policy) = self.policies.get(effective) else {
            tracing::debug!(category = %effective, "No policy for category, request unrestricted");
            metrics::record_decision(effective, identity.tier, Outcome::Unrestricted);
            return Verdict::Unrestricted;
        };

        // A store that panics is treated like one that errors.
        let checked = panic::catch_unwind(AssertUnwindSafe(|| {
            self.limiter.check(&identity.key, effective, policy)
        }))
        .unwrap_or_else(|payload| Err(StoreError::Unavailable(panic_message(payload))));

        match checked {
            Ok(decision) if decision.allowed => {
                metrics::record_decision(effective, identity.tier, Outcome::Allowed);
                Verdict::Admitted(decision)
            }
            Ok(decision) => {
                metrics::record_decision(effective, identity.tier, Outcome::Rejected);
                Verdict::Rejected(decision)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    key = %identity.key,
                    category = %effective,
                    "Window store fault, admitting request"
                );
                metrics::record_store_fault(effective);
                metrics::record_decision(effective, identity.tier, Outcome::FailedOpen);
                Verdict::FailedOpen
            }
        }
    }

    /// Run `handler` for `request` if the caller has quota left for `category`.
    pub async fn guard<F, Fut>(
        &self,
        mut request: Request,
        category: EndpointCategory,
        handler: F,
    ) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let identity = self.resolver.resolve_request(&request);
        let verdict = self.evaluate(&identity, category);
        let effective = category.effective_for(identity.tier);

        match verdict {
            Verdict::Rejected(decision) => {
                let now_ms = self.limiter.now_ms();
                tracing::warn!(
                    key = %identity.key,
                    tier = %identity.tier,
                    category = %effective,
                    retry_after_ms = decision.retry_after_ms(now_ms),
                    "Rate limit exceeded"
                );
                too_many_requests(effective, &decision, now_ms)
            }
            Verdict::Admitted(decision) => {
                request.extensions_mut().insert(identity);
                let mut response = handler(request).await;
                apply_quota_headers(response.headers_mut(), &decision);
                response
            }
            Verdict::Unrestricted | Verdict::FailedOpen => {
                request.extensions_mut().insert(identity);
                handler(request).await
            }
        }
    }

    /// Protect every route of `router` with `category`.
    ///
    /// The timeout and panic guard sit inside the gate so that timed-out and
    /// panicking handlers still produce a response carrying quota headers.
    #[allow(deprecated)]
    pub fn protect<S>(self: &Arc<Self>, category: EndpointCategory, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .route_layer(TimeoutLayer::new(self.request_timeout))
            .route_layer(CatchPanicLayer::new())
            .route_layer(middleware::from_fn_with_state(
                GateState::new(self.clone(), category),
                enforce,
            ))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("store panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("store panicked: {message}")
    } else {
        "store panicked".to_string()
    }
}

/// State handed to [`enforce`] for one group of routes.
#[derive(Clone)]
pub struct GateState {
    pub admission: Arc<Admission>,
    pub category: EndpointCategory,
}

impl GateState {
    pub fn new(admission: Arc<Admission>, category: EndpointCategory) -> Self {
        Self {
            admission,
            category,
        }
    }
}

/// Axum middleware function.
pub async fn enforce(State(gate): State<GateState>, request: Request, next: Next) -> Response {
    gate.admission
        .guard(request, gate.category, |request| next.run(request))
        .await
}
