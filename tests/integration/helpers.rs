//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nodeplug_core::config::AppConfig;
use nodeplug_dom::{Document, Element};
use nodeplug_plugin::{
    AttrType, PluginBehavior, PluginDefinition, PluginHost, PluginInstance, TokioScheduler,
};
use plugin_constrain::ConstrainPlugin;

/// Counts how often each hook ran.
#[derive(Debug, Default)]
pub struct HookCounts {
    renders: AtomicUsize,
    syncs: AtomicUsize,
    destroys: AtomicUsize,
}

impl HookCounts {
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CountingBehavior(pub Arc<HookCounts>);

impl PluginBehavior for CountingBehavior {
    fn render(&self, _plugin: &PluginInstance) {
        self.0.renders.fetch_add(1, Ordering::SeqCst);
    }

    fn sync(&self, _plugin: &PluginInstance) {
        self.0.syncs.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self, _plugin: &PluginInstance) {
        self.0.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test application context
pub struct TestApp {
    /// The document under test
    pub document: Document,
    /// Plugin host installed on the document
    pub host: PluginHost,
}

impl TestApp {
    /// Create a new test application with the constrain plugin registered
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let document = Document::new();
        let scheduler = TokioScheduler::try_current().expect("Failed to bind scheduler");
        let host = PluginHost::install(&document, config, Arc::new(scheduler));
        ConstrainPlugin::new()
            .register(&host)
            .expect("Failed to register constrain");
        Self { document, host }
    }

    /// Defines a plugin shaped like `constrain` whose hooks are counted.
    pub fn define_counting(&self, namespace: &str) -> Arc<HookCounts> {
        let counts = Arc::new(HookCounts::default());
        self.host
            .try_define_plugin(
                PluginDefinition::new(namespace)
                    .attr_with_default("selector", AttrType::String, "window")
                    .behavior(CountingBehavior(counts.clone())),
            )
            .expect("Failed to define plugin");
        counts
    }

    /// Appends a new element to the body.
    pub fn insert(&self, tag: &str, attrs: &[(&str, &str)]) -> Element {
        let element = self.document.create_element_with_attrs(tag, attrs);
        self.document.body().append_child(&element);
        element
    }
}

/// Lets deferred work run without crossing a timer.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Advances (paused) time by `ms` milliseconds.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
