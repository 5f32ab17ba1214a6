//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, tracing, request ID, timeout)
//!     → admission.rs (per route group: resolve → policy → limiter)
//!         rejected → rejection.rs (429 + Retry-After)
//!         admitted → handler → rejection.rs quota headers on its response
//! ```

pub mod admission;
pub mod rejection;
pub mod server;

pub use admission::{enforce, Admission, GateState, Verdict};
pub use rejection::{RejectionBody, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
pub use server::GovernorServer;
