//! Plugin instance lifecycle.
//!
//! One [`PluginInstance`] exists per (element, namespace) pair. Plugging
//! runs, in order: hydration of the model from config/attributes/defaults,
//! the `plugin-<ns>` flag, the constructor chain, model and finalizer
//! subscriptions, the one-time render gate, an initial sync, and finally the
//! `<ns>-ready` flag. Destroying reverses every attribute the instance could
//! have written and detaches every subscription.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use tracing::{debug, info};

use nodeplug_core::types::{FinalizerId, NodeId, ObserverId};
use nodeplug_dom::{Element, WeakElement};

use crate::codec::{AttrValue, attr_name, decode, encode, plugged_attr, ready_attr};
use crate::definition::PluginClass;
use crate::model::{Model, PlugConfig};
use crate::scheduler::Scheduler;
use crate::sync::SyncState;
use crate::table::PluginTable;

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Hydrating the model.
    Constructing,
    /// Model hydrated, constructors and render running.
    Hydrated,
    /// Initial render gate passed; model changes and events trigger syncs.
    Rendered,
    /// A sync is flushing attributes and running the `sync` hook.
    Syncing,
    /// Torn down.
    Destroyed,
}

/// A plugin attached to one element.
pub struct PluginInstance {
    class: Arc<PluginClass>,
    host: WeakElement,
    host_id: NodeId,
    model: RwLock<Model>,
    observer: Mutex<Option<ObserverId>>,
    finalizer: Mutex<Option<FinalizerId>>,
    pub(crate) state: RwLock<LifecycleState>,
    rendered: AtomicBool,
    pub(crate) sync_state: SyncState,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) delayed_sync: Duration,
    pub(crate) this: Weak<PluginInstance>,
}

impl PluginInstance {
    pub(crate) fn new(
        class: Arc<PluginClass>,
        host: &Element,
        model: Option<Model>,
        scheduler: Arc<dyn Scheduler>,
        delayed_sync: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            class,
            host: host.downgrade(),
            host_id: host.id(),
            model: RwLock::new(model.unwrap_or_default()),
            observer: Mutex::new(None),
            finalizer: Mutex::new(None),
            state: RwLock::new(LifecycleState::Constructing),
            rendered: AtomicBool::new(false),
            sync_state: SyncState::default(),
            scheduler,
            delayed_sync,
            this: this.clone(),
        })
    }

    pub fn namespace(&self) -> &str {
        self.class.namespace()
    }

    pub fn class(&self) -> &Arc<PluginClass> {
        &self.class
    }

    /// The host element, while it is alive.
    pub fn host(&self) -> Option<Element> {
        self.host.upgrade()
    }

    pub fn host_id(&self) -> NodeId {
        self.host_id
    }

    /// The model currently bound.
    pub fn model(&self) -> Model {
        self.model.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the initial render gate has passed and the instance is live.
    pub fn is_ready(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::Rendered | LifecycleState::Syncing
        )
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    /// Reads a model key.
    pub fn get(&self, key: &str) -> Option<AttrValue> {
        self.model().get(key)
    }

    /// Writes a model key.
    pub fn set(&self, key: &str, value: impl Into<AttrValue>) {
        self.model().set(key, value);
    }

    /// Sets a model key only when it is not defined yet.
    pub fn define_when_undefined(&self, key: &str, value: impl Into<AttrValue>) -> bool {
        self.model().insert_if_absent(key, value)
    }

    /// Attribute name of a model key on the host.
    pub fn attr_name(&self, key: &str) -> String {
        attr_name(self.namespace(), key)
    }

    /// Replaces the bound model and syncs immediately.
    ///
    /// With `merge_current`, keys of the previous model missing from `model`
    /// are copied over first. Binding the model that is already bound does
    /// nothing.
    pub fn bind_model(&self, model: Model, merge_current: bool) {
        let current = self.model();
        if current.ptr_eq(&model) {
            return;
        }
        if merge_current {
            model.merge_missing_from(&current);
        }

        let observed = self.detach_observer(&current);
        *self.model.write().unwrap_or_else(|e| e.into_inner()) = model;
        if observed {
            self.attach_observer();
        }

        debug!(namespace = %self.namespace(), node = %self.host_id, merge_current, "Model bound");
        self.sync();
    }

    // ── Lifecycle ──

    pub(crate) fn plug(&self, config: &PlugConfig) {
        let Some(host) = self.host() else {
            return;
        };
        let namespace = self.namespace();

        self.hydrate(&host, config);
        host.set_attr_silent(&plugged_attr(namespace), "true");
        if !self.transition(LifecycleState::Hydrated) {
            return;
        }

        for constructor in self.class.constructors() {
            constructor(self, config);
        }
        if self.is_destroyed() {
            return;
        }

        self.attach_observer();
        self.attach_finalizer(&host);

        let pre_rendered = host.get_attr(&ready_attr(namespace)).as_deref() == Some("true");
        if !self.rendered.swap(true, Ordering::SeqCst) && !pre_rendered {
            self.class.behavior().render(self);
        }
        if !self.transition(LifecycleState::Rendered) {
            return;
        }
        self.sync();

        host.set_attr_silent(&ready_attr(namespace), "true");
        PluginTable::of(&host).set_ready(namespace, true);

        info!(namespace = %namespace, node = %self.host_id, pre_rendered, "Plugin plugged");
    }

    pub(crate) fn destroy(&self) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *state == LifecycleState::Destroyed {
                return;
            }
            *state = LifecycleState::Destroyed;
        }

        self.detach_observer(&self.model());
        let host = self.host();
        let finalizer = self
            .finalizer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let (Some(id), Some(document)) = (finalizer, host.as_ref().and_then(Element::document)) {
            document.detach_finalizer(id);
        }

        self.class.behavior().destroy(self);

        if let Some(host) = host {
            let namespace = self.namespace();
            let mut names = self.class.attribute_names();
            names.push(plugged_attr(namespace));
            names.push(ready_attr(namespace));
            host.remove_attrs(names.iter().map(String::as_str), true);

            if let Some(table) = PluginTable::existing(&host) {
                table.remove(self);
                table.set_ready(namespace, false);
            }
        }

        info!(namespace = %self.namespace(), node = %self.host_id, "Plugin destroyed");
    }

    /// Populates the model: config beats the current attribute, which beats
    /// the schema default. Keys already in the model are left alone.
    fn hydrate(&self, host: &Element, config: &PlugConfig) {
        let model = self.model();
        for (key, ty) in self.class.schema() {
            let candidate = config
                .get(key)
                .map(encode)
                .or_else(|| host.get_attr(&self.attr_name(key)))
                .or_else(|| self.class.default_raw(key).map(String::from));

            let value = decode(candidate.as_deref(), ty).or_else(|| {
                debug!(
                    namespace = %self.namespace(),
                    key = %key,
                    attr_type = %ty,
                    raw = ?candidate,
                    "Attribute value invalid; falling back to default"
                );
                decode(self.class.default_raw(key), ty)
            });

            if let Some(value) = value {
                model.insert_if_absent(key, value);
            }
        }
    }

    /// Writes every schema key the model holds to the host, silently.
    pub(crate) fn flush(&self) {
        let Some(host) = self.host() else {
            return;
        };
        let model = self.model();
        let attrs: Vec<(String, String)> = self
            .class
            .schema()
            .keys()
            .filter_map(|key| {
                let raw = encode(&model.get(key)?);
                (raw != "undefined").then(|| (self.attr_name(key), raw))
            })
            .collect();
        if !attrs.is_empty() {
            host.set_attrs(attrs, true);
        }
    }

    /// Moves to `next` unless the instance was destroyed meanwhile.
    fn transition(&self, next: LifecycleState) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state == LifecycleState::Destroyed {
            return false;
        }
        *state = next;
        true
    }

    fn attach_observer(&self) {
        let this = self.this.clone();
        let id = self.model().observe(move |_| {
            if let Some(instance) = this.upgrade() {
                instance.request_model_sync();
            }
        });
        *self.observer.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
    }

    /// Returns whether an observer was attached.
    fn detach_observer(&self, model: &Model) -> bool {
        let id = self
            .observer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match id {
            Some(id) => {
                model.unobserve(id);
                true
            }
            None => false,
        }
    }

    fn attach_finalizer(&self, host: &Element) {
        let Some(document) = host.document() else {
            return;
        };
        let this = self.this.clone();
        let id = document.finalize(move |finalized| {
            if let Some(instance) = this.upgrade() {
                instance.on_finalized(finalized);
            }
        });
        *self.finalizer.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("namespace", &self.namespace())
            .field("host", &self.host_id)
            .field("state", &self.state())
            .field("model", &self.model())
            .finish()
    }
}
