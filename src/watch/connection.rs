//! Reconnection policy for remote watching.

use std::time::Duration;

/// Reconnection attempts in a row before giving up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Maximum backoff duration in seconds
pub const MAX_BACKOFF_SECS: u64 = 8;

/// Delay before reconnect attempt number `attempt` (1-based).
///
/// Attempt 1: immediate
/// Attempt 2: 1 second
/// Attempt 3: 2 seconds
/// Attempt 4: 4 seconds
/// Attempt 5+: 8 seconds (max)
pub fn calculate_backoff(attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let exponent = attempt - 2;
    let secs = 1u64
        .checked_shl(exponent)
        .map_or(MAX_BACKOFF_SECS, |secs| secs.min(MAX_BACKOFF_SECS));
    Duration::from_secs(secs)
}

/// Limits for reconnecting to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Failed attempts in a row before giving up
    pub max_attempts: u32,
    /// Upper bound on the delay between attempts
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            max_backoff: Duration::from_secs(MAX_BACKOFF_SECS),
        }
    }
}

impl ReconnectPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt).min(self.max_backoff)
    }
}
