//! Plugin lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Plugin lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Grace period in milliseconds between a node leaving the document
    /// and its plugins being unplugged.
    #[serde(default = "default_removal_grace")]
    pub removal_grace_ms: u64,
    /// How long the DOM substrate keeps bookkeeping for a detached node
    /// before reclaiming it. The grace period must stay below this.
    #[serde(default = "default_node_retention")]
    pub node_retention_ms: u64,
}

impl PluginConfig {
    /// Grace period as a [`Duration`].
    pub fn removal_grace(&self) -> Duration {
        Duration::from_millis(self.removal_grace_ms)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            removal_grace_ms: default_removal_grace(),
            node_retention_ms: default_node_retention(),
        }
    }
}

fn default_removal_grace() -> u64 {
    5_000
}

fn default_node_retention() -> u64 {
    60_000
}
