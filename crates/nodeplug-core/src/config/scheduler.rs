//! Sync scheduling configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Controls how finalized DOM events are turned into plugin syncs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay in milliseconds used to coalesce bursts of high-frequency events.
    #[serde(default = "default_delayed_sync")]
    pub delayed_sync_ms: u64,
    /// Replaces the built-in set of delayed event names when present.
    #[serde(default)]
    pub delayed_events: Option<Vec<String>>,
}

impl SchedulerConfig {
    /// Burst delay as a [`Duration`].
    pub fn delayed_sync(&self) -> Duration {
        Duration::from_millis(self.delayed_sync_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delayed_sync_ms: default_delayed_sync(),
            delayed_events: None,
        }
    }
}

fn default_delayed_sync() -> u64 {
    500
}
