use std::time::Duration;

use crate::politeness::jitter_up_to;

/// Retry spacing between attempts on the same transport.
///
/// `delay(n)` is the pause after the n-th failed attempt (0-based):
/// `min(base * 2^n, max) + uniform(0, jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub jitter: Duration,
}

impl BackoffPolicy {
    /// Deterministic part of the delay, before jitter.
    pub fn anchor(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let scaled = base_ms.saturating_mul(factor);
        Duration::from_millis(scaled).min(self.max)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.anchor(attempt) + jitter_up_to(self.jitter)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(8),
            jitter: Duration::from_millis(250),
        }
    }
}
