//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Admission middleware, sweeper, startup:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (decision counters, store gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (key, category, tier) rather than formatted strings
//! - Metrics are cheap (atomic increments) and safe to call when no
//!   recorder is installed

pub mod logging;
pub mod metrics;
