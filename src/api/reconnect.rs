use std::time::Duration;

/// Reconnect delay policy for the ticker stream.
///
/// Delay for attempt `n` (0-indexed) is `initial * 2^n`, capped at `max`.
/// There is no attempt limit: monitoring has to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// Same delay before every attempt
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(60))
    }
}
