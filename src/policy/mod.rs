//! Limit policy subsystem.
//!
//! # Data Flow
//! ```text
//! [policies] config section
//!     → table.rs (merge with built-in defaults, validate)
//!     → PolicyTable (immutable, shared via Arc)
//!
//! Per request:
//!     category.rs (EndpointCategory × Tier → effective category)
//!     → PolicyTable::get → LimitPolicy | None (unrestricted)
//! ```

pub mod category;
pub mod table;

pub use category::{EndpointCategory, Tier};
pub use table::{default_limits, Algorithm, LimitPolicy, PolicyError, PolicyTable};
