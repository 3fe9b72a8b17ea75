//! Element-facing plugin operations.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use nodeplug_dom::Element;

use crate::host::PluginHost;
use crate::instance::PluginInstance;
use crate::model::{Model, PlugConfig};
use crate::table::PluginTable;

/// Plugin operations available on any element whose document has a
/// [`PluginHost`] installed.
#[async_trait]
pub trait Pluggable {
    /// Whether `namespace` is plugged on this element.
    fn is_plugged(&self, namespace: &str) -> bool;

    /// Resolves once `namespace` is plugged and has passed its render gate.
    async fn plugin_ready(&self, namespace: &str);

    /// Plugs `namespace`. Returns `None` for an unregistered namespace or
    /// when no host is installed.
    fn plug(
        &self,
        namespace: &str,
        config: Option<&PlugConfig>,
        model: Option<Model>,
    ) -> Option<Arc<PluginInstance>>;

    /// The instance of `namespace`, once it is ready.
    async fn get_plugin(&self, namespace: &str) -> Option<Arc<PluginInstance>>;

    /// Unplugs `namespace`. Does nothing when it is not plugged.
    fn unplug(&self, namespace: &str);
}

#[async_trait]
impl Pluggable for Element {
    fn is_plugged(&self, namespace: &str) -> bool {
        PluginTable::existing(self).is_some_and(|table| table.contains(namespace))
    }

    async fn plugin_ready(&self, namespace: &str) {
        let mut ready = PluginTable::of(self).subscribe_ready(namespace);
        loop {
            let is_ready = *ready.borrow_and_update();
            if is_ready || ready.changed().await.is_err() {
                return;
            }
        }
    }

    fn plug(
        &self,
        namespace: &str,
        config: Option<&PlugConfig>,
        model: Option<Model>,
    ) -> Option<Arc<PluginInstance>> {
        match PluginHost::of(self) {
            Some(host) => host.plug(self, namespace, config, model),
            None => {
                warn!(namespace = %namespace, node = %self.id(), "No plugin host installed for this element");
                None
            }
        }
    }

    async fn get_plugin(&self, namespace: &str) -> Option<Arc<PluginInstance>> {
        self.plugin_ready(namespace).await;
        PluginTable::existing(self).and_then(|table| table.get(namespace))
    }

    fn unplug(&self, namespace: &str) {
        let instance = PluginTable::existing(self).and_then(|table| table.get(namespace));
        if let Some(instance) = instance {
            instance.destroy();
        }
    }
}
