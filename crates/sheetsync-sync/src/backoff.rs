//! Rate-limit backoff
//!
//! [`BackoffPolicy`] is the pure delay schedule; [`BackoffState`] is the
//! coordinator's running position in it. Backoff caps the delay, never the
//! number of attempts.

use std::time::Duration;

use sheetsync_core::config::BackoffConfig;

/// Exponential delay schedule with a floor and a ceiling
///
/// `next = min(max(prev * 2, initial), ceiling)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial: Duration,
    ceiling: Duration,
}

impl BackoffPolicy {
    /// Creates a policy; a ceiling below `initial` is raised to `initial`
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        Self {
            initial,
            ceiling: ceiling.max(initial),
        }
    }

    /// Builds the policy from the `backoff` config section
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial(), config.ceiling())
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Delay following `prev` (`Duration::ZERO` for the first failure)
    pub fn next_delay(&self, prev: Duration) -> Duration {
        prev.saturating_mul(2).max(self.initial).min(self.ceiling)
    }

    /// Delay before retry number `attempt` (1-based); zero for attempt 0
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut delay = Duration::ZERO;
        for _ in 0..attempt {
            delay = self.next_delay(delay);
            if delay == self.ceiling {
                break;
            }
        }
        delay
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}

/// Running backoff position, owned by the coordinator
#[derive(Debug, Clone)]
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    consecutive_failures: u32,
}

impl BackoffState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            current: Duration::ZERO,
            consecutive_failures: 0,
        }
    }

    /// Records a rate-limit failure and returns the delay to wait
    pub fn on_rate_limited(&mut self) -> Duration {
        self.current = self.policy.next_delay(self.current);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.current
    }

    /// Clears the state after a successful export
    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
        self.consecutive_failures = 0;
    }

    /// Last delay handed out; zero after a reset
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_growth_doubles_until_ceiling() {
        let mut state = BackoffState::new(BackoffPolicy::new(secs(1), secs(600)));
        let delays: Vec<u64> = (0..13).map(|_| state.on_rate_limited().as_secs()).collect();
        assert_eq!(
            delays,
            vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 600, 600, 600]
        );
        assert_eq!(state.consecutive_failures(), 13);
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut state = BackoffState::new(BackoffPolicy::new(secs(1), secs(600)));
        for _ in 0..5 {
            state.on_rate_limited();
        }
        assert_eq!(state.current(), secs(16));

        state.reset();
        assert_eq!(state.current(), Duration::ZERO);
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.on_rate_limited(), secs(1));
    }

    #[test]
    fn test_next_delay_formula() {
        let policy = BackoffPolicy::new(secs(5), secs(60));
        assert_eq!(policy.next_delay(Duration::ZERO), secs(5));
        assert_eq!(policy.next_delay(secs(1)), secs(5));
        assert_eq!(policy.next_delay(secs(20)), secs(40));
        assert_eq!(policy.next_delay(secs(40)), secs(60));
        assert_eq!(policy.next_delay(Duration::MAX), secs(60));
    }

    #[test]
    fn test_delay_for_attempt() {
        let policy = BackoffPolicy::new(secs(1), secs(600));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), secs(1));
        assert_eq!(policy.delay_for_attempt(3), secs(4));
        assert_eq!(policy.delay_for_attempt(10), secs(512));
        assert_eq!(policy.delay_for_attempt(11), secs(600));
        assert_eq!(policy.delay_for_attempt(u32::MAX), secs(600));
    }

    #[test]
    fn test_ceiling_below_initial_is_raised() {
        let policy = BackoffPolicy::new(secs(10), secs(1));
        assert_eq!(policy.ceiling(), secs(10));
        assert_eq!(policy.next_delay(secs(10)), secs(10));
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.initial(), secs(1));
        assert_eq!(policy.ceiling(), secs(600));
    }
}
