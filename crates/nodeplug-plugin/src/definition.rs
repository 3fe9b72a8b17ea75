//! Plugin definitions and the classes built from them.
//!
//! A [`PluginDefinition`] is the builder handed to the registry; a
//! [`PluginClass`] is the immutable result shared by every instance of that
//! namespace. Only the behavior of a class can be swapped after definition
//! (hot reload), everything else is fixed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::codec::{AttrType, attr_name};
use crate::instance::PluginInstance;
use crate::model::PlugConfig;

/// Events whose finalization is coalesced into one delayed sync by default.
///
/// `blur` is deliberately absent: it always syncs immediately.
pub const DEFAULT_DELAYED_EVENTS: [&str; 18] = [
    "mousedown",
    "mouseup",
    "mousemove",
    "panmove",
    "panstart",
    "panleft",
    "panright",
    "panup",
    "pandown",
    "pinchmove",
    "rotatemove",
    "focus",
    "manualfocus",
    "keydown",
    "keyup",
    "keypress",
    "resize",
    "scroll",
];

/// The one event that may never be delayed.
pub const IMMEDIATE_ONLY_EVENT: &str = "blur";

/// Lowercases an event name and strips a trailing `outside`.
pub fn normalize_event_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix("outside") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Builds a delayed-event set, refusing `blur`.
pub fn delayed_event_set<I, S>(events: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    events
        .into_iter()
        .map(|event| event.as_ref().trim().to_lowercase())
        .filter(|event| {
            if event == IMMEDIATE_ONLY_EVENT {
                warn!(event = %event, "Event 'blur' cannot be delayed; it always syncs immediately");
                false
            } else {
                !event.is_empty()
            }
        })
        .collect()
}

/// The built-in delayed-event set.
pub fn default_delayed_events() -> BTreeSet<String> {
    delayed_event_set(DEFAULT_DELAYED_EVENTS)
}

/// User-overridable hooks of a plugin class. Every method defaults to a no-op.
pub trait PluginBehavior: Send + Sync + fmt::Debug {
    /// Runs at most once per instance, after hydration, unless the host was
    /// already marked ready.
    fn render(&self, _plugin: &PluginInstance) {}

    /// Runs after every model→attribute flush.
    fn sync(&self, _plugin: &PluginInstance) {}

    /// Runs on teardown, before the plugin's attributes are removed.
    fn destroy(&self, _plugin: &PluginInstance) {}
}

/// Behavior with no side effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBehavior;

impl PluginBehavior for NoopBehavior {}

/// Constructor run while plugging, after hydration and before render.
pub type Constructor = Arc<dyn Fn(&PluginInstance, &PlugConfig) + Send + Sync>;

/// Builder describing a plugin class.
pub struct PluginDefinition {
    pub(crate) namespace: String,
    pub(crate) schema: BTreeMap<String, AttrType>,
    pub(crate) defaults: BTreeMap<String, String>,
    pub(crate) delayed_events: Option<BTreeSet<String>>,
    pub(crate) direct_events: BTreeSet<String>,
    pub(crate) constructor: Option<Constructor>,
    pub(crate) behavior: Option<Arc<dyn PluginBehavior>>,
}

impl PluginDefinition {
    /// Starts a definition for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            schema: BTreeMap::new(),
            defaults: BTreeMap::new(),
            delayed_events: None,
            direct_events: BTreeSet::new(),
            constructor: None,
            behavior: None,
        }
    }

    /// Declares a model key and its type.
    pub fn attr(mut self, key: impl Into<String>, ty: impl Into<AttrType>) -> Self {
        self.schema.insert(key.into(), ty.into());
        self
    }

    /// Declares a model key with a raw default value.
    pub fn attr_with_default(
        mut self,
        key: impl Into<String>,
        ty: impl Into<AttrType>,
        default: impl Into<String>,
    ) -> Self {
        let key = key.into();
        self.defaults.insert(key.clone(), default.into());
        self.schema.insert(key, ty.into());
        self
    }

    /// Sets a raw default for a key.
    pub fn default_value(mut self, key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), raw.into());
        self
    }

    /// Replaces the inherited delayed-event set.
    pub fn delayed_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.delayed_events = Some(delayed_event_set(events));
        self
    }

    /// Makes the given events sync immediately instead of being delayed.
    ///
    /// Names ending in `outside` are reduced to their base event. `blur` is
    /// refused since it is never delayed in the first place.
    pub fn direct_event_response<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for event in events {
            let event = normalize_event_name(event.as_ref());
            if event == IMMEDIATE_ONLY_EVENT {
                warn!(
                    namespace = %self.namespace,
                    "Event 'blur' cannot be configured for direct response"
                );
                continue;
            }
            self.direct_events.insert(event);
        }
        self
    }

    /// Sets the constructor.
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&PluginInstance, &PlugConfig) + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    /// Sets the behavior hooks.
    pub fn behavior(mut self, behavior: impl PluginBehavior + 'static) -> Self {
        self.behavior = Some(Arc::new(behavior));
        self
    }

    /// Sets shared behavior hooks.
    pub fn shared_behavior(mut self, behavior: Arc<dyn PluginBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("namespace", &self.namespace)
            .field("schema", &self.schema)
            .field("defaults", &self.defaults)
            .field("delayed_events", &self.delayed_events)
            .field("direct_events", &self.direct_events)
            .field("constructor", &self.constructor.is_some())
            .field("behavior", &self.behavior)
            .finish()
    }
}

/// A registered plugin class.
pub struct PluginClass {
    namespace: String,
    schema: BTreeMap<String, AttrType>,
    defaults: BTreeMap<String, String>,
    delayed_events: BTreeSet<String>,
    /// Ancestor constructors first.
    constructors: Vec<Constructor>,
    parent: Option<Arc<PluginClass>>,
    /// Behavior the class was defined with; restored by [`PluginClass::reset_behavior`].
    defined_behavior: Arc<dyn PluginBehavior>,
    behavior: RwLock<Arc<dyn PluginBehavior>>,
}

impl PluginClass {
    /// Builds a root class. `namespace` must already be validated.
    pub(crate) fn build(
        namespace: String,
        definition: PluginDefinition,
        base_delayed: &BTreeSet<String>,
    ) -> Self {
        let delayed = definition
            .delayed_events
            .unwrap_or_else(|| base_delayed.clone());
        let behavior: Arc<dyn PluginBehavior> =
            definition.behavior.unwrap_or_else(|| Arc::new(NoopBehavior));

        Self {
            namespace,
            schema: definition.schema,
            defaults: definition.defaults,
            delayed_events: &delayed - &definition.direct_events,
            constructors: definition.constructor.into_iter().collect(),
            parent: None,
            defined_behavior: behavior.clone(),
            behavior: RwLock::new(behavior),
        }
    }

    /// Builds a class inheriting from `parent`.
    pub(crate) fn derive(
        namespace: String,
        parent: Arc<PluginClass>,
        definition: PluginDefinition,
    ) -> Self {
        let mut schema = parent.schema.clone();
        schema.extend(definition.schema);
        let mut defaults = parent.defaults.clone();
        defaults.extend(definition.defaults);
        let delayed = definition
            .delayed_events
            .unwrap_or_else(|| parent.delayed_events.clone());
        let mut constructors = parent.constructors.clone();
        constructors.extend(definition.constructor);
        let behavior = definition
            .behavior
            .unwrap_or_else(|| parent.defined_behavior.clone());

        Self {
            namespace,
            schema,
            defaults,
            delayed_events: &delayed - &definition.direct_events,
            constructors,
            parent: Some(parent),
            defined_behavior: behavior.clone(),
            behavior: RwLock::new(behavior),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Model key → type.
    pub fn schema(&self) -> &BTreeMap<String, AttrType> {
        &self.schema
    }

    /// Raw default for `key`.
    pub fn default_raw(&self, key: &str) -> Option<&str> {
        self.defaults.get(key).map(String::as_str)
    }

    pub fn delayed_events(&self) -> &BTreeSet<String> {
        &self.delayed_events
    }

    /// Whether finalizing `event_type` is coalesced into a delayed sync.
    pub fn is_delayed(&self, event_type: &str) -> bool {
        self.delayed_events.contains(event_type)
    }

    pub fn parent(&self) -> Option<&Arc<PluginClass>> {
        self.parent.as_ref()
    }

    /// Whether this class is `namespace` or inherits from it.
    pub fn is_a(&self, namespace: &str) -> bool {
        self.namespace == namespace
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_a(namespace))
    }

    pub(crate) fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// The behavior currently in effect.
    pub fn behavior(&self) -> Arc<dyn PluginBehavior> {
        self.behavior
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub(crate) fn set_behavior(&self, behavior: Arc<dyn PluginBehavior>) {
        *self.behavior.write().unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    /// Restores the behavior the class was defined with.
    pub(crate) fn reset_behavior(&self) {
        self.set_behavior(self.defined_behavior.clone());
    }

    /// Names of every schema attribute this class can write on a host.
    pub fn attribute_names(&self) -> Vec<String> {
        self.schema
            .keys()
            .map(|key| attr_name(&self.namespace, key))
            .collect()
    }
}

impl fmt::Debug for PluginClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginClass")
            .field("namespace", &self.namespace)
            .field("schema", &self.schema)
            .field("defaults", &self.defaults)
            .field("delayed_events", &self.delayed_events)
            .field(
                "parent",
                &self.parent.as_ref().map(|parent| parent.namespace()),
            )
            .field("constructors", &self.constructors.len())
            .field("behavior", &self.behavior())
            .finish()
    }
}
