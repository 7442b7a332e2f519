//! Poller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed-interval, bounded-attempt polling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay between two polls of the same job (milliseconds).
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Polls made before giving up with a timeout.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_max_attempts() -> u32 {
    30
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
