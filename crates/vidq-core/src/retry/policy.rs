use std::time::Duration;

/// Exponential backoff with a cap.
///
/// A zero `base_delay` disables backoff entirely, which is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait before running retry number `retry` (1-based).
    /// `retry == 0` is a first attempt and never waits.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        // base * 2^(retry-1), capped.
        let exp = 1u32 << retry.saturating_sub(1).min(8);
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }
}
