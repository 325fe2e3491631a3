use std::time::Duration;

use rand::Rng;

/// Upper bound on the number of attempts for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// Retry retryable failures until one succeeds. A provider that keeps
    /// answering with a retryable error will block the caller forever.
    Unbounded,
    /// Total attempts, including the first one. Zero is treated as one.
    MaxAttempts(u32),
}

/// Randomized exponential backoff between `min_wait` and `max_wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub limit: RetryLimit,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
            limit: RetryLimit::Unbounded,
        }
    }
}

impl RetryPolicy {
    pub fn with_limit(mut self, limit: RetryLimit) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_waits(mut self, min_wait: Duration, max_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self.max_wait = max_wait.max(min_wait);
        self
    }

    /// Whether another attempt may follow `failed_attempts` failures.
    pub fn allows_retry(&self, failed_attempts: u32) -> bool {
        match self.limit {
            RetryLimit::Unbounded => true,
            RetryLimit::MaxAttempts(max) => failed_attempts < max.max(1),
        }
    }

    /// Upper end of the wait window after `failed_attempts` failures (1-based):
    /// `min_wait * 2^(n-1)` clamped into `[min_wait, max_wait]`.
    pub fn wait_ceiling(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        self.min_wait
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_wait)
            .clamp(self.min_wait, self.max_wait.max(self.min_wait))
    }

    /// Samples a wait uniformly from `[min_wait, wait_ceiling(n)]`.
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        let low = duration_micros(self.min_wait);
        let high = duration_micros(self.wait_ceiling(failed_attempts));
        if high <= low {
            return self.min_wait;
        }
        Duration::from_micros(rand::thread_rng().gen_range(low..=high))
    }
}

fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
