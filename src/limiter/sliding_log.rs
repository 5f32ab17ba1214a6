//! Sliding-window log.
//!
//! Keeps the timestamp of every admitted request inside the window, so the
//! quota holds over any rolling interval. Memory per key is bounded by the
//! quota.

use std::collections::VecDeque;

use crate::limiter::AdmissionDecision;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlidingLogState {
    /// Admission times, oldest first.
    pub timestamps: VecDeque<u64>,
}

impl SlidingLogState {
    pub fn admit(&mut self, now_ms: u64, window_ms: u64, max_requests: u32) -> AdmissionDecision {
        self.evict_aged(now_ms, window_ms);

        let allowed = self.timestamps.len() < max_requests as usize;
        if allowed {
            self.timestamps.push_back(now_ms);
        }

        let reset_at_ms = self
            .timestamps
            .front()
            .map_or(now_ms, |oldest| *oldest)
            .saturating_add(window_ms);

        if allowed {
            let remaining = max_requests as usize - self.timestamps.len();
            AdmissionDecision::allowed(max_requests, remaining as u32, reset_at_ms)
        } else {
            AdmissionDecision::denied(max_requests, reset_at_ms)
        }
    }

    /// Drop entries that are a full window old or older.
    fn evict_aged(&mut self, now_ms: u64, window_ms: u64) {
        while let Some(oldest) = self.timestamps.front() {
            if now_ms.saturating_sub(*oldest) >= window_ms {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Instant at which every logged request has aged out.
    pub fn expires_at_ms(&self, now_ms: u64, window_ms: u64) -> u64 {
        self.timestamps
            .back()
            .map_or(now_ms, |newest| newest.saturating_add(window_ms))
    }
}
