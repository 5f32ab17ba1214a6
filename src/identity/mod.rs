//! Identity resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request headers (+ peer address)
//!     → Authorization: Bearer <token>?
//!         → verifier.rs (external credential check)
//!             ok    → user:<subject>, tier user | admin
//!             error → fall through
//!     → X-Forwarded-For / X-Real-IP / peer → <ip>|<user-agent>, tier anonymous
//! ```
//!
//! # Design Decisions
//! - Fail open on identity, never on quota: a bad credential only downgrades
//!   the caller to the stricter anonymous identity
//! - Resolution is pure over the request; the same request always yields the
//!   same key

pub mod resolver;
pub mod verifier;

pub use resolver::{Identity, IdentityResolver, RateKey};
pub use verifier::{Claims, CredentialVerifier, StaticTokenVerifier, VerifyError};
