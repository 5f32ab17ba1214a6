//! Per-key limiter state.

use crate::limiter::fixed_window::FixedWindowState;
use crate::limiter::sliding_log::SlidingLogState;
use crate::limiter::token_bucket::TokenBucketState;

/// State of one (RateKey, EndpointCategory) pair, shaped by its algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowRecord {
    FixedWindow(FixedWindowState),
    SlidingLog(SlidingLogState),
    TokenBucket(TokenBucketState),
}

/// Slot held by the store.
///
/// `record` is `None` only between lazy creation and the first update.
/// `expires_at_ms` is maintained by the limiter on every update; once it has
/// passed the record carries no information a fresh one would not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowEntry {
    pub record: Option<WindowRecord>,
    pub expires_at_ms: u64,
}

impl WindowEntry {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
