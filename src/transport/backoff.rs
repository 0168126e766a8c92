//! Reconnect policy and the fixed backoff ladder

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{Result, TelemetryError};

/// When to retry a dropped or failed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before retry `n` is `ladder_ms[n - 1]`; the last step repeats
    pub ladder_ms: Vec<u64>,

    /// Consecutive failures allowed before giving up; `None` retries forever
    pub max_attempts: Option<u32>,

    pub connect_timeout_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            ladder_ms: vec![1_000, 2_000, 4_000, 8_000, 15_000],
            max_attempts: Some(10),
            connect_timeout_ms: 5_000,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the retry that follows failure number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt.max(1) as usize - 1).min(self.ladder_ms.len().saturating_sub(1));
        Duration::from_millis(self.ladder_ms.get(index).copied().unwrap_or(0))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ladder_ms.is_empty() {
            return Err(TelemetryError::config("reconnect ladder must have at least one step"));
        }
        if self.max_attempts == Some(0) {
            return Err(TelemetryError::config("max_attempts must be positive, or omitted"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(TelemetryError::config("connect timeout must be positive"));
        }
        Ok(())
    }
}

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    /// Attempt limit exceeded; stay down until reset
    Exhausted,
}

/// Counts consecutive failures against a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct ReconnectTracker {
    policy: ReconnectPolicy,
    attempt_count: u32,
}

impl ReconnectTracker {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt_count: 0 }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn record_failure(&mut self) -> RetryDecision {
        self.attempt_count = self.attempt_count.saturating_add(1);
        if self.policy.max_attempts.is_some_and(|max| self.attempt_count > max) {
            return RetryDecision::Exhausted;
        }
        let delay = self.policy.delay_for(self.attempt_count);
        debug!(attempt = self.attempt_count, ?delay, "Scheduling reconnect");
        RetryDecision::Retry(delay)
    }

    pub fn record_success(&mut self) {
        self.attempt_count = 0;
    }

    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(n: u64) -> RetryDecision {
        RetryDecision::Retry(Duration::from_secs(n))
    }

    #[test]
    fn ladder_then_cap() {
        let mut tracker = ReconnectTracker::new(ReconnectPolicy::default());
        let delays: Vec<_> = (0..7).map(|_| tracker.record_failure()).collect();
        assert_eq!(delays, vec![secs(1), secs(2), secs(4), secs(8), secs(15), secs(15), secs(15)]);
        assert_eq!(tracker.attempt_count(), 7);
    }

    #[test]
    fn success_resets_attempts() {
        let mut tracker = ReconnectTracker::new(ReconnectPolicy::default());
        tracker.record_failure();
        tracker.record_failure();
        tracker.record_success();
        assert_eq!(tracker.attempt_count(), 0);
        assert_eq!(tracker.record_failure(), secs(1));
    }

    #[test]
    fn exceeding_max_attempts_is_terminal() {
        let policy = ReconnectPolicy { max_attempts: Some(3), ..ReconnectPolicy::default() };
        let mut tracker = ReconnectTracker::new(policy);
        assert_eq!(tracker.record_failure(), secs(1));
        assert_eq!(tracker.record_failure(), secs(2));
        assert_eq!(tracker.record_failure(), secs(4));
        assert_eq!(tracker.record_failure(), RetryDecision::Exhausted);

        tracker.reset();
        assert_eq!(tracker.record_failure(), secs(1));
    }

    #[test]
    fn validation() {
        assert!(ReconnectPolicy::default().validate().is_ok());
        assert!(ReconnectPolicy { ladder_ms: vec![], ..Default::default() }.validate().is_err());
        assert!(ReconnectPolicy { max_attempts: Some(0), ..Default::default() }.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_delay_follows_ladder(failures in 1u32..200) {
            let mut tracker = ReconnectTracker::new(ReconnectPolicy { max_attempts: None, ..Default::default() });
            let ladder = [1u64, 2, 4, 8, 15];
            let mut last = RetryDecision::Exhausted;
            for _ in 0..failures {
                last = tracker.record_failure();
            }
            let expected = ladder[(failures as usize - 1).min(ladder.len() - 1)];
            prop_assert_eq!(last, secs(expected));
        }
    }
}
