//! Fixed-delay retry policy.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// How many times an operation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Treated as at least one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy for the connectivity probe: 3 attempts, 5 seconds apart.
    pub const PROBE: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(5));

    /// Policy for sending a book: 3 attempts, 30 seconds apart.
    pub const SEND: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(30));

    /// Creates a policy.
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Attempt numbers, starting at 1.
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts.max(1)
    }

    /// Returns true if `attempt` is the final one allowed.
    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts.max(1)
    }

    /// Sleeps for the retry delay.
    ///
    /// Returns `false` if `cancel` fired before the delay elapsed.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_policies() {
        assert_eq!(RetryPolicy::PROBE.max_attempts, 3);
        assert_eq!(RetryPolicy::PROBE.delay, Duration::from_secs(5));
        assert_eq!(RetryPolicy::SEND.max_attempts, 3);
        assert_eq!(RetryPolicy::SEND.delay, Duration::from_secs(30));
    }

    #[test]
    fn attempts_are_one_based() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert_eq!(policy.attempts().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(!policy.is_last(2));
        assert!(policy.is_last(3));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.attempts().count(), 1);
        assert!(policy.is_last(1));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_waits_for_delay() {
        let policy = RetryPolicy::new(2, Duration::from_secs(30));
        let start = tokio::time::Instant::now();

        assert!(policy.pause(&CancellationToken::new()).await);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_on_cancel() {
        let policy = RetryPolicy::new(2, Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let start = tokio::time::Instant::now();
        assert!(!policy.pause(&cancel).await);
        assert!(start.elapsed() < Duration::from_secs(30));
    }
}
