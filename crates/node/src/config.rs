use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Polling cadence and buffering of the relay loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Delay between two polls of the consensus layer.
    pub poll_interval_secs: u64,
    /// Delay after a failed poll.
    pub retry_interval_secs: u64,
    /// Updates buffered per channel before new ones are dropped.
    pub channel_capacity: usize,
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { poll_interval_secs: 10, retry_interval_secs: 30, channel_capacity: 10 }
    }
}
