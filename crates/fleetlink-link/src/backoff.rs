//! Reconnect delay policy.

use std::time::Duration;

/// Configuration for the reconnect delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay after the first failed connect, and after every ended session.
    pub initial: Duration,
    /// Upper bound for the delay.
    pub max: Duration,
    /// Factor applied after each consecutive failed connect.
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

/// Exponential backoff state for one supervisor.
///
/// ```text
/// connect fails   → sleep next_delay()   (1s, 2s, 4s, … capped)
/// connect works   → reset()
/// session ends    → sleep current()      (1s after a reset; no doubling)
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `config.initial` (clamped to `config.max`).
    pub fn new(config: BackoffConfig) -> Self {
        let current = config.initial.min(config.max);
        Self { config, current }
    }

    /// The delay the next sleep would use, without advancing.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the delay to sleep after a failed connect and advances to
    /// the next, longer delay.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(self.config.multiplier.max(1))
            .min(self.config.max);
        delay
    }

    /// Back to the initial delay. Called on every successful connect.
    pub fn reset(&mut self) {
        self.current = self.config.initial.min(self.config.max);
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
