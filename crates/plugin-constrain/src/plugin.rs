//! Constrain plugin implementation: registers with a plugin host.

use std::sync::Arc;

use tracing::{debug, info};

use nodeplug_core::AppResult;
use nodeplug_plugin::{AttrType, PluginBehavior, PluginClass, PluginDefinition, PluginHost, PluginInstance};

/// Namespace the plugin registers under.
pub const NAMESPACE: &str = "constrain";

/// Model key of the constraining container.
pub const SELECTOR: &str = "selector";

/// Container used when none is configured.
pub const DEFAULT_SELECTOR: &str = "window";

/// Hooks of the constrain plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstrainBehavior;

impl PluginBehavior for ConstrainBehavior {
    fn render(&self, plugin: &PluginInstance) {
        debug!(node = %plugin.host_id(), selector = %ConstrainPlugin::selector(plugin), "Constrain rendered");
    }

    fn sync(&self, plugin: &PluginInstance) {
        debug!(node = %plugin.host_id(), selector = %ConstrainPlugin::selector(plugin), "Constrain synced");
    }
}

/// The constrain plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstrainPlugin;

impl ConstrainPlugin {
    pub fn new() -> Self {
        Self
    }

    /// The plugin definition.
    pub fn definition(&self) -> PluginDefinition {
        PluginDefinition::new(NAMESPACE)
            .attr_with_default(SELECTOR, AttrType::String, DEFAULT_SELECTOR)
            .behavior(ConstrainBehavior)
    }

    /// Registers the plugin on `host`. Registering again returns the class
    /// already defined.
    pub fn register(&self, host: &PluginHost) -> AppResult<Arc<PluginClass>> {
        if let Some(class) = host.get_plugin_class(NAMESPACE) {
            return Ok(class);
        }
        let class = host.try_define_plugin(self.definition())?;
        info!(namespace = NAMESPACE, "Constrain plugin registered");
        Ok(class)
    }

    /// The selector an instance is constrained to.
    pub fn selector(plugin: &PluginInstance) -> String {
        plugin
            .get(SELECTOR)
            .and_then(|value| value.as_str().map(String::from))
            .unwrap_or_else(|| DEFAULT_SELECTOR.to_string())
    }
}
