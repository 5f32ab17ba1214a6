//! Limiter algorithms.
//!
//! # Data Flow
//! ```text
//! RateLimiter::check(key, category, policy)
//!     → clock.rs (now, epoch ms)
//!     → WindowStore::get_or_create (per-key critical section)
//!         → fixed_window.rs | sliding_log.rs | token_bucket.rs
//!     → AdmissionDecision
//! ```
//!
//! # Design Decisions
//! - Algorithms are plain state machines over epoch milliseconds; all
//!   concurrency lives in the store
//! - The policy variant picks the algorithm, so a record never changes shape
//!   unless its policy does

pub mod clock;
pub mod decision;
pub mod fixed_window;
pub mod sliding_log;
pub mod token_bucket;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::AdmissionDecision;

use std::sync::Arc;

use crate::identity::RateKey;
use crate::policy::{EndpointCategory, LimitPolicy};
use crate::store::{StoreError, WindowEntry, WindowRecord, WindowStore};

use fixed_window::FixedWindowState;
use sliding_log::SlidingLogState;
use token_bucket::TokenBucketState;

/// Runs policies against a shared window store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Count one request for `key` under `policy`.
    pub fn check(
        &self,
        key: &RateKey,
        category: EndpointCategory,
        policy: &LimitPolicy,
    ) -> Result<AdmissionDecision, StoreError> {
        let now_ms = self.clock.now_ms();
        self.store
            .get_or_create(key, category, &mut |entry| admit(entry, policy, now_ms))
    }

    /// Drop expired records. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.store.prune(self.clock.now_ms())
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn store(&self) -> &Arc<dyn WindowStore> {
        &self.store
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("records", &self.store.len())
            .finish()
    }
}

/// Apply `policy` to one store entry and refresh its expiry.
pub fn admit(entry: &mut WindowEntry, policy: &LimitPolicy, now_ms: u64) -> AdmissionDecision {
    let record = entry.record.take();
    let (decision, record, expires_at_ms) = match *policy {
        LimitPolicy::FixedWindow {
            window_ms,
            max_requests,
        } => {
            let mut state = match record {
                Some(WindowRecord::FixedWindow(state)) => state,
                _ => FixedWindowState::default(),
            };
            let decision = state.admit(now_ms, window_ms, max_requests);
            let expires = state.expires_at_ms();
            (decision, WindowRecord::FixedWindow(state), expires)
        }
        LimitPolicy::SlidingLog {
            window_ms,
            max_requests,
        } => {
            let mut state = match record {
                Some(WindowRecord::SlidingLog(state)) => state,
                _ => SlidingLogState::default(),
            };
            let decision = state.admit(now_ms, window_ms, max_requests);
            let expires = state.expires_at_ms(now_ms, window_ms);
            (decision, WindowRecord::SlidingLog(state), expires)
        }
        LimitPolicy::TokenBucket {
            capacity,
            refill_per_second,
        } => {
            let mut state = match record {
                Some(WindowRecord::TokenBucket(state)) => state,
                _ => TokenBucketState::full(capacity, now_ms),
            };
            let decision = state.admit(now_ms, capacity, refill_per_second);
            let expires = state.expires_at_ms(capacity, refill_per_second);
            (decision, WindowRecord::TokenBucket(state), expires)
        }
    };

    entry.record = Some(record);
    entry.expires_at_ms = expires_at_ms;
    decision
}
