use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Consecutive-failure ceiling plus backoff bounds shared by the pumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_consecutive_failures: u32,
    backoff_initial: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub const fn new(
        max_consecutive_failures: u32,
        backoff_initial: Duration,
        backoff_max: Duration,
    ) -> Self {
        Self {
            max_consecutive_failures,
            backoff_initial,
            backoff_max,
        }
    }

    pub const fn max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures
    }

    /// Delays double from `backoff_initial` (rounded up to whole even
    /// milliseconds) and saturate at `backoff_max`. A non-zero initial delay
    /// never collapses to zero.
    fn schedule(&self) -> ExponentialBackoff {
        let initial_ms = u64::try_from(self.backoff_initial.as_millis()).unwrap_or(u64::MAX);
        let factor = if self.backoff_initial.is_zero() {
            0
        } else {
            initial_ms.div_ceil(2).max(1)
        };
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.backoff_max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(50), Duration::from_secs(1))
    }
}

/// Per-loop counter of consecutive failures.
///
/// The counter is compared right after each increment, so with a ceiling of 5
/// the sixth consecutive failure exhausts the budget. Any success resets it.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: RetryPolicy,
    failures: u32,
    schedule: ExponentialBackoff,
}

impl RetryBudget {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
            schedule: policy.schedule(),
        }
    }

    /// Record a failed attempt.
    ///
    /// Returns the delay to wait before the next attempt, or `None` once the
    /// ceiling is exceeded and the loop must stop.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.is_exhausted() {
            return None;
        }
        Some(self.schedule.next().unwrap_or(self.policy.backoff_max))
    }

    pub fn record_success(&mut self) {
        if self.failures > 0 {
            self.failures = 0;
            self.schedule = self.policy.schedule();
        }
    }

    pub const fn failures(&self) -> u32 {
        self.failures
    }

    pub const fn is_exhausted(&self) -> bool {
        self.failures > self.policy.max_consecutive_failures
    }
}
