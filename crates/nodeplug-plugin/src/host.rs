//! Plugin host, the per-document plugin context.
//!
//! A host owns the plugin registry and the scheduler for one document and
//! keeps the lifecycle bridge subscribed to that document's mutation events.
//! Elements find their host through the document, so the element-facing
//! [`Pluggable`](crate::Pluggable) operations need no extra arguments.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use nodeplug_core::config::AppConfig;
use nodeplug_core::types::ListenerId;
use nodeplug_dom::{Document, Element};

use crate::bridge;
use crate::codec::{plugged_attr, ready_attr};
use crate::definition::{
    PluginBehavior, PluginClass, PluginDefinition, default_delayed_events, delayed_event_set,
};
use crate::error::PluginError;
use crate::instance::PluginInstance;
use crate::model::{Model, PlugConfig};
use crate::registry::PluginRegistry;
use crate::scheduler::Scheduler;
use crate::table::PluginTable;

pub(crate) struct HostInner {
    document: Document,
    registry: Arc<PluginRegistry>,
    scheduler: Arc<dyn Scheduler>,
    config: AppConfig,
    listeners: Mutex<Vec<ListenerId>>,
    /// Cleared by `shutdown`; pending tasks become no-ops afterwards.
    active: AtomicBool,
}

/// What a sweep does with flagged elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SweepMode {
    /// Plug flagged elements that lack the plugin.
    Plug,
    /// Resync flagged elements that are plugged and ready.
    Resync,
}

/// Non-owning handle to a host.
#[derive(Clone)]
pub(crate) struct WeakHost(Weak<HostInner>);

impl WeakHost {
    /// The host, unless it was dropped or shut down.
    pub(crate) fn upgrade(&self) -> Option<PluginHost> {
        self.0
            .upgrade()
            .map(|inner| PluginHost { inner })
            .filter(PluginHost::is_active)
    }
}

/// Plugin context bound to one document.
#[derive(Clone)]
pub struct PluginHost {
    inner: Arc<HostInner>,
}

impl PluginHost {
    /// Installs a host on `document`.
    ///
    /// Installation happens once per document: a second call logs a warning
    /// and returns the host already installed.
    pub fn install(document: &Document, config: AppConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        if let Some(existing) = Self::for_document(document) {
            warn!("Plugin host already installed on this document");
            return existing;
        }

        let delayed = match &config.scheduler.delayed_events {
            Some(events) => delayed_event_set(events),
            None => default_delayed_events(),
        };
        let host = Self {
            inner: Arc::new(HostInner {
                document: document.clone(),
                registry: Arc::new(PluginRegistry::with_delayed_events(delayed)),
                scheduler,
                config,
                listeners: Mutex::new(Vec::new()),
                active: AtomicBool::new(true),
            }),
        };

        document.extensions().insert(host.downgrade());
        let listeners = bridge::install(&host);
        host.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(listeners);

        info!(
            removal_grace_ms = host.inner.config.plugins.removal_grace_ms,
            delayed_sync_ms = host.inner.config.scheduler.delayed_sync_ms,
            "Plugin host installed"
        );
        host
    }

    /// The host installed on `document`, if any.
    pub fn for_document(document: &Document) -> Option<Self> {
        document
            .extensions()
            .get::<WeakHost>()
            .and_then(|weak| weak.upgrade())
    }

    /// The host installed on the document owning `element`, if any.
    pub fn of(element: &Element) -> Option<Self> {
        element
            .document()
            .and_then(|document| Self::for_document(&document))
    }

    pub(crate) fn downgrade(&self) -> WeakHost {
        WeakHost(Arc::downgrade(&self.inner))
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.inner.registry
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.inner.scheduler
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Whether the host still reacts to the document.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub(crate) fn removal_grace(&self) -> Duration {
        self.inner.config.plugins.removal_grace()
    }

    // ── Classes ──

    /// Defines a plugin class and plugs it into every element already
    /// flagged `plugin-<ns>="true"` on the next turn.
    pub fn try_define_plugin(
        &self,
        definition: PluginDefinition,
    ) -> Result<Arc<PluginClass>, PluginError> {
        let class = self.inner.registry.try_define(definition)?;
        self.schedule_sweep(class.namespace(), SweepMode::Plug);
        Ok(class)
    }

    /// Logging counterpart of [`PluginHost::try_define_plugin`]: a duplicate
    /// returns the original class, an invalid namespace returns `None`.
    pub fn define_plugin(&self, definition: PluginDefinition) -> Option<Arc<PluginClass>> {
        let namespace = definition.namespace().to_string();
        let result = self.try_define_plugin(definition);
        self.inner.registry.resolve(&namespace, result)
    }

    /// Defines a class inheriting from the class registered under `parent`.
    pub fn try_subclass_plugin(
        &self,
        parent: &str,
        definition: PluginDefinition,
    ) -> Result<Arc<PluginClass>, PluginError> {
        let class = self.inner.registry.try_subclass(parent, definition)?;
        self.schedule_sweep(class.namespace(), SweepMode::Plug);
        Ok(class)
    }

    pub fn subclass_plugin(
        &self,
        parent: &str,
        definition: PluginDefinition,
    ) -> Option<Arc<PluginClass>> {
        let namespace = definition.namespace().to_string();
        let result = self.try_subclass_plugin(parent, definition);
        self.inner.registry.resolve(&namespace, result)
    }

    pub fn get_plugin_class(&self, namespace: &str) -> Option<Arc<PluginClass>> {
        self.inner.registry.get(namespace)
    }

    /// Swaps the behavior of a class and resyncs every ready element using it.
    pub fn redefine_behavior(
        &self,
        namespace: &str,
        behavior: impl PluginBehavior + 'static,
    ) -> Result<(), PluginError> {
        let class = self
            .get_plugin_class(namespace)
            .ok_or_else(|| PluginError::NotRegistered(namespace.to_string()))?;
        class.set_behavior(Arc::new(behavior));
        info!(namespace = %namespace, "Plugin behavior redefined");
        self.schedule_sweep(namespace, SweepMode::Resync);
        Ok(())
    }

    /// Restores the behavior a class was defined with and resyncs.
    pub fn reset_behavior(&self, namespace: &str) -> Result<(), PluginError> {
        let class = self
            .get_plugin_class(namespace)
            .ok_or_else(|| PluginError::NotRegistered(namespace.to_string()))?;
        class.reset_behavior();
        info!(namespace = %namespace, "Plugin behavior reset");
        self.schedule_sweep(namespace, SweepMode::Resync);
        Ok(())
    }

    // ── Instances ──

    /// Plugs `namespace` into `element`.
    ///
    /// Plugging an already-plugged namespace returns the existing instance,
    /// rebinding `model` when one is given.
    pub fn try_plug(
        &self,
        element: &Element,
        namespace: &str,
        config: Option<&PlugConfig>,
        model: Option<Model>,
    ) -> Result<Arc<PluginInstance>, PluginError> {
        let owned_by_host = element
            .document()
            .is_some_and(|document| document.ptr_eq(&self.inner.document));
        if !owned_by_host || !self.is_active() {
            return Err(PluginError::HostUnavailable);
        }
        let class = self
            .get_plugin_class(namespace)
            .ok_or_else(|| PluginError::NotRegistered(namespace.to_string()))?;

        let mut model = model;
        let (instance, created) = PluginTable::of(element).get_or_insert_with(namespace, || {
            PluginInstance::new(
                class,
                element,
                model.take(),
                self.inner.scheduler.clone(),
                self.inner.config.scheduler.delayed_sync(),
            )
        });

        if created {
            let defaults = PlugConfig::default();
            instance.plug(config.unwrap_or(&defaults));
        } else {
            warn!(namespace = %namespace, node = %element.id(), "Plugin already plugged");
            if let Some(model) = model {
                instance.bind_model(model, false);
            }
        }
        Ok(instance)
    }

    /// Logging counterpart of [`PluginHost::try_plug`].
    pub fn plug(
        &self,
        element: &Element,
        namespace: &str,
        config: Option<&PlugConfig>,
        model: Option<Model>,
    ) -> Option<Arc<PluginInstance>> {
        match self.try_plug(element, namespace, config, model) {
            Ok(instance) => Some(instance),
            Err(e) => {
                warn!(namespace = %namespace, node = %element.id(), error = %e, "Plug refused");
                None
            }
        }
    }

    /// Unplugs `namespace` from `element`.
    pub fn try_unplug(&self, element: &Element, namespace: &str) -> Result<(), PluginError> {
        let instance = self
            .plugin(element, namespace)
            .ok_or_else(|| PluginError::NotPlugged(namespace.to_string()))?;
        instance.destroy();
        Ok(())
    }

    /// Unplugs `namespace` from `element`. Returns whether it was plugged.
    pub fn unplug(&self, element: &Element, namespace: &str) -> bool {
        self.try_unplug(element, namespace).is_ok()
    }

    /// The instance of `namespace` plugged on `element`.
    pub fn plugin(&self, element: &Element, namespace: &str) -> Option<Arc<PluginInstance>> {
        PluginTable::existing(element).and_then(|table| table.get(namespace))
    }

    pub fn is_plugged(&self, element: &Element, namespace: &str) -> bool {
        PluginTable::existing(element).is_some_and(|table| table.contains(namespace))
    }

    /// Unsubscribes the bridge and unplugs every plugin in the document.
    pub fn shutdown(&self) {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        let listeners: Vec<ListenerId> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for id in listeners {
            self.inner.document.unsubscribe(id);
        }

        let mut unplugged = 0usize;
        for element in self.inner.document.body().subtree() {
            let Some(table) = PluginTable::existing(&element) else {
                continue;
            };
            for namespace in table.namespaces() {
                unplugged += usize::from(self.unplug(&element, &namespace));
            }
        }

        self.inner.document.extensions().remove::<WeakHost>();
        info!(unplugged, "Plugin host shut down");
    }

    // ── Sweeps ──

    pub(crate) fn schedule_sweep(&self, namespace: &str, mode: SweepMode) {
        let host = self.downgrade();
        let namespace = namespace.to_string();
        self.inner.scheduler.defer(Box::new(move || {
            if let Some(host) = host.upgrade() {
                host.sweep(&namespace, mode);
            }
        }));
    }

    /// Visits every connected element flagged `plugin-<ns>="true"`.
    ///
    /// A definition plugs the ones lacking the plugin; a behavior swap
    /// resyncs the ones already ready.
    fn sweep(&self, namespace: &str, mode: SweepMode) {
        if !self.is_active() {
            return;
        }
        let flag = plugged_attr(namespace);
        let ready = ready_attr(namespace);
        let mut plugged = 0usize;
        let mut resynced = 0usize;
        for element in self.inner.document.query_by_attrs(&[(flag.as_str(), "true")]) {
            match (mode, self.plugin(&element, namespace)) {
                (SweepMode::Resync, Some(instance)) => {
                    if element.get_attr(&ready).as_deref() == Some("true") {
                        instance.sync();
                        resynced += 1;
                    }
                }
                (SweepMode::Plug, None) => {
                    if self.plug(&element, namespace, None, None).is_some() {
                        plugged += 1;
                    }
                }
                (SweepMode::Plug, Some(_)) | (SweepMode::Resync, None) => {}
            }
        }
        debug!(namespace = %namespace, plugged, resynced, "Plugin sweep finished");
    }
}

impl fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("registry", &self.inner.registry)
            .field("scheduler", &self.inner.scheduler)
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pluggable::Pluggable;
    use crate::testing::{connected_div, define_counting, settle, setup};

    #[tokio::test]
    async fn test_install_is_once_per_document() {
        let (document, host) = setup();
        let again = PluginHost::install(
            &document,
            AppConfig::default(),
            host.scheduler().clone(),
        );
        assert!(Arc::ptr_eq(&host.inner, &again.inner));
    }

    #[tokio::test]
    async fn test_plug_errors() {
        let (document, host) = setup();
        let element = connected_div(&document);
        assert_eq!(
            host.try_plug(&element, "missing", None, None).err(),
            Some(PluginError::NotRegistered("missing".into()))
        );

        define_counting(&host, "constrain");
        let foreign = Document::new().create_element("div");
        assert_eq!(
            host.try_plug(&foreign, "constrain", None, None).err(),
            Some(PluginError::HostUnavailable)
        );
        assert_eq!(
            host.try_unplug(&element, "constrain"),
            Err(PluginError::NotPlugged("constrain".into()))
        );
    }

    #[tokio::test]
    async fn test_plug_writes_control_attributes_and_is_stable() {
        let (document, host) = setup();
        let counters = define_counting(&host, "constrain");
        let element = connected_div(&document);

        let first = element.plug("constrain", None, None).expect("plugged");
        assert!(element.is_plugged("constrain"));
        assert_eq!(element.get_attr("plugin-constrain").as_deref(), Some("true"));
        assert_eq!(element.get_attr("constrain-ready").as_deref(), Some("true"));
        assert_eq!(element.get_attr("constrain-selector").as_deref(), Some("window"));
        assert_eq!(counters.renders(), 1);
        assert_eq!(counters.syncs(), 1);

        let second = element.plug("constrain", None, None).expect("plugged");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counters.renders(), 1);

        element.unplug("constrain");
        assert!(!element.is_plugged("constrain"));
        assert_eq!(counters.destroys(), 1);
        assert!(element.attrs().is_empty());
    }

    #[tokio::test]
    async fn test_replug_rebinds_supplied_model() {
        let (document, host) = setup();
        define_counting(&host, "constrain");
        let element = connected_div(&document);
        let instance = element.plug("constrain", None, None).unwrap();

        let shared = Model::from_values([("selector", "#shared")]);
        element.plug("constrain", None, Some(shared.clone()));
        assert!(instance.model().ptr_eq(&shared));
        assert_eq!(element.get_attr("constrain-selector").as_deref(), Some("#shared"));
    }

    #[tokio::test]
    async fn test_pre_rendered_element_skips_render() {
        let (document, host) = setup();
        let counters = define_counting(&host, "constrain");
        let element = document.create_element_with_attrs("div", &[("constrain-ready", "true")]);
        document.body().append_child(&element);

        element.plug("constrain", None, None).unwrap();
        assert_eq!(counters.renders(), 0);
        assert_eq!(counters.syncs(), 1);
    }

    #[tokio::test]
    async fn test_constructors_run_ancestor_first() {
        let (document, host) = setup();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let log = order.clone();
        host.try_define_plugin(
            PluginDefinition::new("base").constructor(move |_, _| log.lock().unwrap().push("base")),
        )
        .unwrap();
        let log = order.clone();
        host.try_subclass_plugin(
            "base",
            PluginDefinition::new("derived")
                .constructor(move |_, _| log.lock().unwrap().push("derived")),
        )
        .unwrap();

        let element = connected_div(&document);
        element.plug("derived", None, None).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["base", "derived"]);
        assert!(!element.is_plugged("base"));
    }

    #[tokio::test]
    async fn test_define_sweeps_flagged_markup() {
        let (document, host) = setup();
        let element = document.create_element_with_attrs("div", &[("plugin-constrain", "true")]);
        document.body().append_child(&element);
        settle().await;
        assert!(!element.is_plugged("constrain"));

        define_counting(&host, "constrain");
        assert!(!element.is_plugged("constrain"));
        settle().await;
        assert!(element.is_plugged("constrain"));
        assert_eq!(element.get_attr("constrain-ready").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_define_sweep_leaves_plugged_elements_alone() {
        let (document, host) = setup();
        let counters = define_counting(&host, "constrain");
        let element = connected_div(&document);
        element.plug("constrain", None, None).unwrap();
        assert_eq!(counters.syncs(), 1);

        settle().await;
        assert_eq!(counters.syncs(), 1);
        assert_eq!(counters.renders(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_work() {
        let (document, host) = setup();
        let flagged = document.create_element_with_attrs("div", &[("plugin-constrain", "true")]);
        document.body().append_child(&flagged);
        let toggled = connected_div(&document);
        define_counting(&host, "constrain");
        toggled.set_attr("plugin-constrain", "true");

        host.shutdown();
        assert!(!host.is_active());
        settle().await;
        assert!(!flagged.is_plugged("constrain"));
        assert!(!toggled.is_plugged("constrain"));
        assert_eq!(
            host.try_plug(&toggled, "constrain", None, None).err(),
            Some(PluginError::HostUnavailable)
        );
    }

    #[tokio::test]
    async fn test_redefine_behavior_resyncs_ready_elements() {
        #[derive(Debug)]
        struct Marker(Arc<AtomicUsize>);
        impl PluginBehavior for Marker {
            fn sync(&self, _plugin: &PluginInstance) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let (document, host) = setup();
        let counters = define_counting(&host, "constrain");
        let element = connected_div(&document);
        element.plug("constrain", None, None).unwrap();
        assert_eq!(counters.syncs(), 1);

        let marker = Arc::new(AtomicUsize::new(0));
        host.redefine_behavior("constrain", Marker(marker.clone())).unwrap();
        settle().await;
        assert_eq!(marker.load(Ordering::SeqCst), 1);
        assert_eq!(counters.syncs(), 1);

        host.reset_behavior("constrain").unwrap();
        settle().await;
        assert_eq!(counters.syncs(), 2);
        assert_eq!(
            host.redefine_behavior("missing", Marker(marker)),
            Err(PluginError::NotRegistered("missing".into()))
        );
    }

    #[tokio::test]
    async fn test_shutdown_unplugs_everything() {
        let (document, host) = setup();
        let counters = define_counting(&host, "constrain");
        let a = connected_div(&document);
        let b = connected_div(&document);
        a.plug("constrain", None, None).unwrap();
        b.plug("constrain", None, None).unwrap();

        host.shutdown();
        assert!(!a.is_plugged("constrain"));
        assert!(!b.is_plugged("constrain"));
        assert_eq!(counters.destroys(), 2);
        assert!(PluginHost::for_document(&document).is_none());
        assert!(a.plug("constrain", None, None).is_none());
    }
}
