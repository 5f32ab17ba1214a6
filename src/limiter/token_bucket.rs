//! Token bucket.
//!
//! Quota is a pool of up to `capacity` tokens refilled continuously at
//! `refill_per_second`. Each admitted request takes one token.

use crate::limiter::AdmissionDecision;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucketState {
    pub tokens: f64,
    pub last_refill_ms: u64,
}

impl TokenBucketState {
    /// A bucket that starts full.
    pub fn full(capacity: u32, now_ms: u64) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill_ms: now_ms,
        }
    }

    fn refill(&mut self, now_ms: u64, capacity: u32, refill_per_second: f64) {
        let elapsed_ms = now_ms.saturating_sub(self.last_refill_ms);
        let refilled = self.tokens + elapsed_ms as f64 / 1000.0 * refill_per_second;
        self.tokens = refilled.min(capacity as f64);
        self.last_refill_ms = self.last_refill_ms.max(now_ms);
    }

    pub fn admit(&mut self, now_ms: u64, capacity: u32, refill_per_second: f64) -> AdmissionDecision {
        self.refill(now_ms, capacity, refill_per_second);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            let until_full = self.ms_until(capacity as f64, refill_per_second);
            AdmissionDecision::allowed(
                capacity,
                self.tokens.floor() as u32,
                now_ms.saturating_add(until_full),
            )
        } else {
            let until_next = self.ms_until(1.0, refill_per_second);
            AdmissionDecision::denied(capacity, now_ms.saturating_add(until_next))
        }
    }

    /// Milliseconds until the bucket holds `target` tokens.
    ///
    /// A bucket that never refills reports zero.
    fn ms_until(&self, target: f64, refill_per_second: f64) -> u64 {
        if self.tokens >= target || refill_per_second <= 0.0 {
            return 0;
        }
        ((target - self.tokens) / refill_per_second * 1000.0).ceil() as u64
    }

    /// Instant at which the bucket is full again.
    ///
    /// From then on the record is indistinguishable from a fresh bucket, so it
    /// can be dropped without changing any future decision.
    pub fn expires_at_ms(&self, capacity: u32, refill_per_second: f64) -> u64 {
        self.last_refill_ms
            .saturating_add(self.ms_until(capacity as f64, refill_per_second))
    }
}
