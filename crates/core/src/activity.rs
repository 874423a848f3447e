//! Idle-activity tracking for the lifecycle controller.
//!
//! The clock records the timestamp of the last client-observed activity
//! (`start`, `keep-alive`) and answers whether the instance has been idle
//! past the configured timeout. Concurrent requests touch the clock, so
//! the timestamp lives behind a mutex rather than being process-global
//! mutable state.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of the activity clock, shaped for the `/activity` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    /// ISO-8601 timestamp of the last recorded activity.
    pub last_activity: DateTime<Utc>,
    /// Whole seconds elapsed since the last activity.
    pub seconds_since_activity: i64,
    /// True once the idle timeout has elapsed with no activity.
    pub is_inactive: bool,
    /// The configured idle timeout, in seconds.
    pub timeout_seconds: i64,
}

/// Process-wide activity clock with a fixed idle threshold.
pub struct ActivityClock {
    last_activity: Mutex<DateTime<Utc>>,
    timeout: Duration,
}

impl ActivityClock {
    /// Create a clock whose last activity is "now".
    pub fn new(timeout: Duration) -> Self {
        Self::starting_at(timeout, Utc::now())
    }

    /// Create a clock with an explicit initial timestamp (tests).
    pub fn starting_at(timeout: Duration, start: DateTime<Utc>) -> Self {
        Self {
            last_activity: Mutex::new(start),
            timeout,
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    /// Record activity at an explicit timestamp (tests).
    pub fn touch_at(&self, now: DateTime<Utc>) {
        let mut last = self
            .last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = now;
    }

    /// Timestamp of the last recorded activity.
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Report against the current time.
    pub fn report(&self) -> ActivityReport {
        self.report_at(Utc::now())
    }

    /// Report against an explicit "now" (tests).
    pub fn report_at(&self, now: DateTime<Utc>) -> ActivityReport {
        let last = self.last_activity();
        let elapsed = now.signed_duration_since(last);
        let timeout_seconds = self.timeout.as_secs() as i64;

        ActivityReport {
            last_activity: last,
            seconds_since_activity: elapsed.num_seconds().max(0),
            is_inactive: elapsed.num_seconds() > timeout_seconds,
            timeout_seconds,
        }
    }
}
