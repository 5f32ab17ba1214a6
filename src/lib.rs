//! Request-rate governance for authentication, course-management and
//! analytics endpoints.

pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod policy;
pub mod store;

pub use config::GovernorConfig;
pub use http::{Admission, GovernorServer};
pub use lifecycle::Shutdown;
