//! Reconnection policy with a constant delay

use std::time::Duration;

/// Default delay between reconnection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Default bound on consecutive reconnection attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// When and how often a lost or failed connection is retried
///
/// The attempt counter is owned by the session and resets on every
/// successful open, so `max_attempts` bounds *consecutive* failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether to retry at all
    pub enabled: bool,
    /// Maximum consecutive attempts (0 = unlimited)
    pub max_attempts: u32,
    /// Wait before each attempt
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay before each attempt
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set maximum attempts (0 = unlimited)
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Never reconnect
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Check if reconnection attempt number `attempt` (1-indexed) may run
    pub fn should_reconnect(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt <= self.max_attempts)
    }

    /// Delay before attempt number `attempt`
    pub fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }
}
