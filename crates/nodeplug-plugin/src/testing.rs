//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nodeplug_core::config::AppConfig;
use nodeplug_dom::{Document, Element};

use crate::codec::AttrType;
use crate::definition::{PluginBehavior, PluginDefinition};
use crate::host::PluginHost;
use crate::instance::PluginInstance;
use crate::scheduler::TokioScheduler;

/// Hook invocation counters.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub renders: AtomicUsize,
    pub syncs: AtomicUsize,
    pub destroys: AtomicUsize,
}

impl Counters {
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
pub(crate) struct CountingBehavior(pub Arc<Counters>);

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

/// A document with a host installed on the current runtime.
pub(crate) fn setup() -> (Document, PluginHost) {
    let document = Document::new();
    let scheduler = TokioScheduler::try_current().expect("tokio runtime");
    let host = PluginHost::install(&document, AppConfig::default(), Arc::new(scheduler));
    (document, host)
}

/// Defines a `constrain`-shaped class counting its hook calls.
pub(crate) fn define_counting(host: &PluginHost, namespace: &str) -> Arc<Counters> {
    let counters = Arc::new(Counters::default());
    host.try_define_plugin(
        PluginDefinition::new(namespace)
            .attr_with_default("selector", AttrType::String, "window")
            .behavior(CountingBehavior(counters.clone())),
    )
    .expect("valid definition");
    counters
}

/// A connected `<div>`.
pub(crate) fn connected_div(document: &Document) -> Element {
    let element = document.create_element("div");
    document.body().append_child(&element);
    element
}

/// Lets deferred tasks run without crossing any timer.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
