//! Reconnect backoff
//!
//! Delay before retrying a failed connect, doubled on each consecutive
//! failure and capped at one minute. A successful connect resets the delay
//! to the configured base interval. Closure of an established connection
//! schedules a reconnect at the current delay without changing it; only
//! failed connect attempts escalate.

use std::time::Duration;

/// Ceiling for the reconnect delay
pub const MAX_DELAY: Duration = Duration::from_millis(60_000);

/// Doubling, capped reconnect delay
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Backoff {
            base,
            current: base,
        }
    }

    /// Delay to wait before the next attempt, unchanged
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Record a failed connect attempt; doubles the delay up to
    /// [`MAX_DELAY`] and returns the new value
    pub fn connect_failed(&mut self) -> Duration {
        self.current = (self.current * 2).min(MAX_DELAY);
        self.current
    }

    /// Record a successful connect; the delay returns to the base interval
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}
