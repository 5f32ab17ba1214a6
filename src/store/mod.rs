//! Window store subsystem.
//!
//! # Data Flow
//! ```text
//! RateLimiter::check
//!     → WindowStore::get_or_create(key, category, update)
//!         (entry created lazily, update runs under the per-key lock)
//!
//! lifecycle::sweeper (interval)
//!     → WindowStore::prune(now) drops entries whose expiry has passed
//! ```
//!
//! # Design Decisions
//! - Owned by the limiter instance and injected, never a global
//! - One entry per (RateKey, EndpointCategory)
//! - State is process-local and lost on restart; running several instances
//!   multiplies the effective quota by the instance count
//! - The trait is the seam for a shared store with atomic remote updates

pub mod memory;
pub mod record;

pub use memory::MemoryWindowStore;
pub use record::{WindowEntry, WindowRecord};

use thiserror::Error;

use crate::identity::RateKey;
use crate::limiter::AdmissionDecision;
use crate::policy::EndpointCategory;

/// Unexpected failure inside a store. Callers fail open on it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("window store unavailable: {0}")]
    Unavailable(String),
}

pub trait WindowStore: Send + Sync {
    /// Run `update` against the entry for `(key, category)`, creating an empty
    /// entry first if there is none. No other update or prune touches the
    /// entry until `update` returns.
    fn get_or_create(
        &self,
        key: &RateKey,
        category: EndpointCategory,
        update: &mut dyn FnMut(&mut WindowEntry) -> AdmissionDecision,
    ) -> Result<AdmissionDecision, StoreError>;

    /// Remove every entry that expired at or before `now_ms`. Returns the
    /// number removed.
    fn prune(&self, now_ms: u64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
