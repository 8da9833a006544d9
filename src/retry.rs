//! Fixed-interval polling policy shared by the background pollers.

use std::time::Duration;

/// How often a background poller ticks and when it stops trying.
///
/// There is no backoff: every tick is `interval` apart, whether the previous
/// one failed or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// Consecutive failed ticks after which the poller stops. `None` retries forever.
    pub give_up_after: Option<u32>,
}

impl RetryPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            give_up_after: None,
        }
    }

    pub fn with_give_up_after(mut self, failures: Option<u32>) -> Self {
        self.give_up_after = failures;
        self
    }

    /// Whether `consecutive_failures` has reached the give-up threshold.
    pub fn exhausted(&self, consecutive_failures: u32) -> bool {
        self.give_up_after
            .is_some_and(|limit| consecutive_failures >= limit)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_never_gives_up() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(60));
        assert!(!policy.exhausted(u32::MAX));
    }

    #[test]
    fn test_give_up_threshold() {
        let policy = RetryPolicy::new(Duration::from_secs(1)).with_give_up_after(Some(3));
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
    }
}
