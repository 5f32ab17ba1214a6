//! Result of a single admission check.

/// Allow/deny outcome plus the quota metadata reported to the client.
///
/// Recomputed on every check and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Configured quota or bucket capacity.
    pub limit: u32,
    pub remaining: u32,
    /// Epoch milliseconds at which the caller's quota is restored.
    pub reset_at_ms: u64,
}

impl AdmissionDecision {
    pub fn allowed(limit: u32, remaining: u32, reset_at_ms: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at_ms,
        }
    }

    pub fn denied(limit: u32, reset_at_ms: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at_ms,
        }
    }

    /// Milliseconds the caller should wait, zero if the reset already passed.
    pub fn retry_after_ms(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms)
    }
}
