//! Fixed-window counter.
//!
//! Counts requests in windows that start with the first request after the
//! previous window ended. A client can fit up to twice the quota into a short
//! span straddling a window boundary; that is how this strategy behaves and it
//! is left as is. Use the sliding log where that matters.

use crate::limiter::AdmissionDecision;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedWindowState {
    pub count: u32,
    pub reset_at_ms: u64,
}

impl FixedWindowState {
    /// Count one request and decide whether it fits in the current window.
    ///
    /// Denied requests still count, so hammering an exhausted key keeps it
    /// exhausted until the window ends.
    pub fn admit(&mut self, now_ms: u64, window_ms: u64, max_requests: u32) -> AdmissionDecision {
        if now_ms >= self.reset_at_ms {
            self.count = 0;
            self.reset_at_ms = now_ms.saturating_add(window_ms);
        }
        self.count = self.count.saturating_add(1);

        if self.count <= max_requests {
            AdmissionDecision::allowed(
                max_requests,
                max_requests - self.count,
                self.reset_at_ms,
            )
        } else {
            AdmissionDecision::denied(max_requests, self.reset_at_ms)
        }
    }

    pub fn expires_at_ms(&self) -> u64 {
        self.reset_at_ms
    }
}
