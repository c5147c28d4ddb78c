//! Backoff and budget for poll-until-ready.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Default delay before the first re-check: 30 seconds.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(30);

/// Default cap on the delay between checks: 5 minutes.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5 * 60);

/// Default growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Default total time budget: 30 minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Shortest sleep between two checks, whatever the configured delays.
pub const MIN_DELAY: Duration = Duration::from_millis(100);

/// Bounded exponential backoff with an explicit total budget.
///
/// The delay before re-check `n` (zero-based) is
/// `initial_delay * multiplier^n`, capped at `max_delay` and never shorter
/// than [`MIN_DELAY`]. A multiplier below 1 (or NaN) is treated as 1. Polling
/// stops once `timeout` has elapsed since the first check; the last sleep is
/// shortened so that a final check happens right at the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay before the first re-check.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: f64,
    /// Total time budget across all checks.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PollPolicy {
    /// Creates a policy with the given initial delay and budget and the
    /// default multiplier and cap.
    pub fn new(initial_delay: Duration, timeout: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: DEFAULT_MAX_DELAY.max(initial_delay),
            multiplier: DEFAULT_MULTIPLIER,
            timeout,
        }
    }

    /// Sleeps the same `delay` between every check.
    pub fn fixed(delay: Duration, timeout: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            timeout,
        }
    }

    /// Checks exactly once and never sleeps.
    pub fn no_wait() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            timeout: Duration::ZERO,
        }
    }

    /// Sets the delay before the first re-check.
    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Sets the cap on any single delay.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the growth factor.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the total budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the delay to sleep after the check numbered `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = if self.multiplier.is_nan() {
            1.0
        } else {
            self.multiplier.max(1.0)
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * multiplier.powi(exponent);

        Duration::try_from_secs_f64(scaled)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
            .max(MIN_DELAY)
    }

    /// Returns when the budget started at `started_at` runs out, or `None`
    /// when that lies beyond what the clock can represent.
    pub fn deadline(&self, started_at: Instant) -> Option<Instant> {
        started_at.checked_add(self.timeout)
    }

    /// Returns how long to sleep after check `attempt` at `now`, or `None`
    /// once the deadline has been reached.
    pub(crate) fn next_sleep(
        &self,
        attempt: u32,
        now: Instant,
        deadline: Option<Instant>,
    ) -> Option<Duration> {
        let delay = self.delay_for(attempt);
        match deadline {
            Some(deadline) if now >= deadline => None,
            Some(deadline) => Some(delay.min(deadline - now)),
            None => Some(delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_secs(60));
        assert_eq!(policy.delay_for(2), Duration::from_secs(120));
        assert_eq!(policy.delay_for(3), Duration::from_secs(240));
        assert_eq!(policy.delay_for(4), Duration::from_secs(300));
        assert_eq!(policy.timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_delay_saturates_at_cap() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for(1_000), DEFAULT_MAX_DELAY);
        assert_eq!(policy.delay_for(u32::MAX), DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_fixed_policy() {
        let policy = PollPolicy::fixed(Duration::from_secs(120), Duration::from_secs(600));
        for attempt in 0..5 {
            assert_eq!(policy.delay_for(attempt), Duration::from_secs(120));
        }
    }

    #[test]
    fn test_no_wait() {
        let policy = PollPolicy::no_wait();
        let now = Instant::now();
        assert_eq!(policy.timeout, Duration::ZERO);
        assert_eq!(policy.next_sleep(0, now, policy.deadline(now)), None);
    }

    #[test]
    fn test_delay_never_below_floor() {
        let zero = PollPolicy::default().with_initial_delay(Duration::ZERO);
        assert_eq!(zero.delay_for(0), MIN_DELAY);
        assert_eq!(zero.delay_for(10), MIN_DELAY);

        let zero_cap = PollPolicy::fixed(Duration::ZERO, Duration::from_secs(60));
        assert_eq!(zero_cap.delay_for(3), MIN_DELAY);
    }

    #[test]
    fn test_shrinking_or_nan_multiplier_acts_as_fixed() {
        let shrinking = PollPolicy::new(Duration::from_secs(8), Duration::from_secs(600))
            .with_multiplier(0.5);
        assert_eq!(shrinking.delay_for(0), Duration::from_secs(8));
        assert_eq!(shrinking.delay_for(5), Duration::from_secs(8));

        let nan = shrinking.with_multiplier(f64::NAN);
        assert_eq!(nan.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_unrepresentable_deadline_is_unbounded() {
        let policy = PollPolicy::fixed(Duration::from_secs(1), Duration::from_secs(u64::MAX));
        let now = Instant::now();

        assert_eq!(policy.deadline(now), None);
        assert_eq!(policy.next_sleep(7, now, None), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_last_sleep_is_truncated_to_deadline() {
        let policy = PollPolicy::fixed(Duration::from_secs(40), Duration::from_secs(100));
        let started_at = Instant::now();
        let deadline = policy.deadline(started_at);

        let now = started_at + Duration::from_secs(80);
        assert_eq!(policy.next_sleep(2, now, deadline), Some(Duration::from_secs(20)));
        let now = started_at + Duration::from_secs(100);
        assert_eq!(policy.next_sleep(3, now, deadline), None);
    }

    #[test]
    fn test_builders() {
        let policy = PollPolicy::new(Duration::from_secs(1), Duration::from_secs(10))
            .with_multiplier(3.0)
            .with_max_delay(Duration::from_secs(5));

        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for(2), Duration::from_secs(5));
    }
}
