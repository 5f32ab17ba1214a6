//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with one route group per endpoint category
//! - Wire up middleware (tracing, request ID); per-route deadlines come from
//!   the admission gate
//! - Serve with peer addresses so anonymous callers can fall back to them
//!
//! The content, auth and analytics handlers behind the gate live elsewhere;
//! the routes here answer with a small JSON acknowledgement so the gate can be
//! exercised end to end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GovernorConfig;
use crate::http::admission::Admission;
use crate::identity::Identity;
use crate::lifecycle::shutdown;
use crate::policy::EndpointCategory;

/// HTTP server fronting the protected endpoints.
pub struct GovernorServer {
    router: Router,
    config: GovernorConfig,
}

impl GovernorServer {
    pub fn new(config: GovernorConfig, admission: Arc<Admission>) -> Self {
        let router = Self::build_router(&config, &admission);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &GovernorConfig, admission: &Arc<Admission>) -> Router {
        let auth = Router::new()
            .merge(admission.protect(
                EndpointCategory::Login,
                Router::new().route("/auth/login", post(acknowledge)),
            ))
            .merge(admission.protect(
                EndpointCategory::Signup,
                Router::new().route("/auth/signup", post(acknowledge)),
            ))
            .merge(admission.protect(
                EndpointCategory::PasswordReset,
                Router::new().route("/auth/password-reset", post(acknowledge)),
            ))
            .merge(admission.protect(
                EndpointCategory::SocialAuth,
                Router::new().route("/auth/social/{provider}", get(acknowledge).post(acknowledge)),
            ));

        let content = Router::new()
            .merge(admission.protect(
                EndpointCategory::Public,
                Router::new()
                    .route("/courses", get(acknowledge))
                    .route("/courses/{slug}", get(acknowledge)),
            ))
            .merge(admission.protect(
                EndpointCategory::User,
                Router::new().route("/me/courses", get(acknowledge).post(acknowledge)),
            ))
            .merge(admission.protect(
                EndpointCategory::Sensitive,
                Router::new().route("/analytics/events", get(acknowledge).post(acknowledge)),
            ))
            .merge(admission.protect(
                EndpointCategory::Admin,
                Router::new().route(
                    "/admin/courses",
                    get(acknowledge).post(acknowledge).delete(acknowledge),
                ),
            ));

        // Protected routes carry their own deadline inside the gate.
        let health = get(health).layer(TimeoutLayer::new(Duration::from_secs(
            config.listener.request_timeout_secs,
        )));

        Router::new()
            .route("/health", health)
            .merge(auth)
            .merge(content)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Stand-in for the real endpoint handlers.
async fn acknowledge(identity: Option<Extension<Identity>>, request: Request) -> Json<Value> {
    let (key, tier) = match identity {
        Some(Extension(identity)) => (identity.key.to_string(), identity.tier.as_str()),
        None => ("unknown".to_string(), "anonymous"),
    };
    Json(json!({
        "method": request.method().as_str(),
        "path": request.uri().path(),
        "key": key,
        "tier": tier,
    }))
}
