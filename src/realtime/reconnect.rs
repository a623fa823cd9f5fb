//! Reconnect policy for the realtime channel.
//!
//! Implements linear backoff with a bounded attempt count.

use std::time::Duration;

/// Reconnect policy implementing linear backoff.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay unit; the n-th consecutive failure waits `base_delay * n`.
    pub base_delay: Duration,
    /// Consecutive failed connection attempts before giving up.
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Delay before the attempt following `failures` consecutive
    /// failures. Linear: `base_delay * failures`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.base_delay * failures
    }

    /// True once `failures` consecutive failures have exhausted the
    /// configured bound.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}
