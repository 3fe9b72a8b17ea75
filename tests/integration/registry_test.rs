//! Integration tests for plugin definition and hot reload.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nodeplug_core::AppError;
use nodeplug_core::error::ErrorKind;
use nodeplug_plugin::{PluginBehavior, PluginDefinition, PluginError, PluginInstance, Pluggable};

use crate::helpers::{TestApp, settle};

#[tokio::test]
async fn test_invalid_and_duplicate_namespaces() {
    let app = TestApp::new();

    assert!(app.host.define_plugin(PluginDefinition::new("")).is_none());
    assert!(app.host.define_plugin(PluginDefinition::new("a-b")).is_none());

    let original = app.host.get_plugin_class("constrain").unwrap();
    let duplicate = app.host.define_plugin(PluginDefinition::new("constrain")).unwrap();
    assert!(Arc::ptr_eq(&original, &duplicate));

    let err: AppError = app
        .host
        .try_define_plugin(PluginDefinition::new("constrain"))
        .unwrap_err()
        .into();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_unregistered_plug_is_refused() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);

    assert!(element.plug("unknown", None, None).is_none());
    assert!(matches!(
        app.host.try_plug(&element, "unknown", None, None),
        Err(PluginError::NotRegistered(_))
    ));
    assert!(!element.is_plugged("unknown"));
}

#[tokio::test]
async fn test_subclass_inherits_schema_and_defaults() {
    let app = TestApp::new();
    let class = app
        .host
        .subclass_plugin("constrain", PluginDefinition::new("pinned"))
        .unwrap();
    assert!(class.is_a("constrain"));
    assert!(class.schema().contains_key("selector"));

    let element = app.insert("div", &[]);
    element.plug("pinned", None, None).unwrap();
    assert_eq!(element.get_attr("pinned-selector").as_deref(), Some("window"));
}

#[tokio::test]
async fn test_redefined_behavior_resyncs_rendered_elements() {
    #[derive(Debug)]
    struct Tally(Arc<AtomicUsize>);
    impl PluginBehavior for Tally {
        fn sync(&self, _plugin: &PluginInstance) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let app = TestApp::new();
    let rendered = app.insert("div", &[]);
    rendered.plug("constrain", None, None).unwrap();
    let detached = app.document.create_element("div");
    detached.plug("constrain", None, None).unwrap();

    let tally = Arc::new(AtomicUsize::new(0));
    app.host
        .redefine_behavior("constrain", Tally(tally.clone()))
        .unwrap();
    assert_eq!(tally.load(Ordering::SeqCst), 0);

    settle().await;
    assert_eq!(tally.load(Ordering::SeqCst), 1);
}
