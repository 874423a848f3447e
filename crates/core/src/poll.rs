//! Explicit poll and backoff policies.
//!
//! Polling loops (provider operation waits, completion-marker waits) take
//! their timing from an injected [`PollPolicy`] instead of hard-coded
//! sleeps, so tests run with zero intervals and bounded attempts.

use std::time::Duration;

/// Timing for a polling loop: a fixed interval between checks and an
/// optional cap on the number of checks.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Delay between consecutive checks.
    pub interval: Duration,
    /// Maximum number of checks; `None` polls until the condition holds.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Observed default for provider operation completion (2s, unbounded).
    pub fn operation_wait() -> Self {
        Self::new(Duration::from_secs(2), None)
    }

    /// Observed default for job completion markers (5s, unbounded).
    pub fn completion_wait() -> Self {
        Self::new(Duration::from_secs(5), None)
    }

    /// Whether another check is allowed after `attempts` completed checks.
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }
}

/// Next delay for a bounded exponential backoff, clamped to `max`.
///
/// Used when transient storage errors interrupt a completion poll: the
/// loop keeps waiting for the marker but backs off its error retries.
pub fn next_delay(current: Duration, multiplier: f64, max: Duration) -> Duration {
    let next_ms = (current.as_millis() as f64 * multiplier) as u64;
    Duration::from_millis(next_ms).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_policy_always_allows_attempts() {
        let policy = PollPolicy::completion_wait();
        assert!(policy.allows_attempt(0));
        assert!(policy.allows_attempt(1_000_000));
    }

    #[test]
    fn bounded_policy_stops_at_max() {
        let policy = PollPolicy::new(Duration::ZERO, Some(3));
        assert!(policy.allows_attempt(0));
        assert!(policy.allows_attempt(2));
        assert!(!policy.allows_attempt(3));
    }

    #[test]
    fn next_delay_doubles() {
        let d = next_delay(Duration::from_secs(1), 2.0, Duration::from_secs(30));
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let d = next_delay(Duration::from_secs(20), 2.0, Duration::from_secs(30));
        assert_eq!(d, Duration::from_secs(30));
    }
}
