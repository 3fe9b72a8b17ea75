//! Per-element bookkeeping stored in the element's extensions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use nodeplug_dom::Element;

use crate::instance::PluginInstance;

/// The plugins plugged on one element, plus their readiness signals.
#[derive(Debug, Default)]
pub(crate) struct PluginTable {
    plugins: Mutex<HashMap<String, Arc<PluginInstance>>>,
    ready: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl PluginTable {
    /// The table of `element`, created on first use.
    pub(crate) fn of(element: &Element) -> Arc<Self> {
        element.extensions().get_or_insert_with(Self::default)
    }

    /// The table of `element` if it ever had one.
    pub(crate) fn existing(element: &Element) -> Option<Arc<Self>> {
        element.extensions().get::<Self>()
    }

    pub(crate) fn get(&self, namespace: &str) -> Option<Arc<PluginInstance>> {
        self.lock_plugins().get(namespace).cloned()
    }

    pub(crate) fn contains(&self, namespace: &str) -> bool {
        self.lock_plugins().contains_key(namespace)
    }

    /// Returns the instance under `namespace`, creating it with `create`
    /// when absent. The flag tells whether it was created.
    pub(crate) fn get_or_insert_with<F>(
        &self,
        namespace: &str,
        create: F,
    ) -> (Arc<PluginInstance>, bool)
    where
        F: FnOnce() -> Arc<PluginInstance>,
    {
        let mut plugins = self.lock_plugins();
        if let Some(existing) = plugins.get(namespace) {
            return (existing.clone(), false);
        }
        let instance = create();
        plugins.insert(namespace.to_string(), instance.clone());
        (instance, true)
    }

    /// Removes `instance` if it is still the one registered under its namespace.
    pub(crate) fn remove(&self, instance: &PluginInstance) -> bool {
        let mut plugins = self.lock_plugins();
        match plugins.get(instance.namespace()) {
            Some(current) if std::ptr::eq(Arc::as_ptr(current), instance) => {
                plugins.remove(instance.namespace());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.lock_plugins().keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    /// Publishes the readiness of `namespace`.
    pub(crate) fn set_ready(&self, namespace: &str, ready: bool) {
        let mut signals = self.ready.lock().unwrap_or_else(|e| e.into_inner());
        match signals.get(namespace) {
            Some(sender) => {
                sender.send_replace(ready);
            }
            None => {
                signals.insert(namespace.to_string(), watch::channel(ready).0);
            }
        }
    }

    /// Subscribes to the readiness of `namespace`.
    pub(crate) fn subscribe_ready(&self, namespace: &str) -> watch::Receiver<bool> {
        let mut signals = self.ready.lock().unwrap_or_else(|e| e.into_inner());
        signals
            .entry(namespace.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    fn lock_plugins(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<PluginInstance>>> {
        self.plugins.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Counts how often an element left the document. A pending teardown only
/// proceeds if no later removal happened in between.
#[derive(Debug, Default)]
pub(crate) struct RemovalEpoch(AtomicU64);

impl RemovalEpoch {
    pub(crate) fn of(element: &Element) -> Arc<Self> {
        element.extensions().get_or_insert_with(Self::default)
    }

    /// Records a removal and returns its epoch.
    pub(crate) fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
