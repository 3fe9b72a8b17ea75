//! Integration tests for plugging, hydration and teardown.

use std::sync::Arc;
use std::time::Duration;

use nodeplug_plugin::{AttrValue, LifecycleState, Model, PlugConfig, Pluggable};
use plugin_constrain::{ConstrainPlugin, NAMESPACE};

use crate::helpers::{TestApp, advance, settle};

#[tokio::test]
async fn test_plug_then_unplug_toggles_is_plugged() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);

    element.plug(NAMESPACE, None, None).expect("plugged");
    assert!(element.is_plugged(NAMESPACE));

    element.unplug(NAMESPACE);
    assert!(!element.is_plugged(NAMESPACE));

    element.unplug(NAMESPACE);
    assert!(!element.is_plugged(NAMESPACE));
}

#[tokio::test]
async fn test_plug_twice_returns_same_instance() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let element = app.insert("div", &[]);

    let first = element.plug("counted", None, None).unwrap();
    let second = element.plug("counted", None, None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(counts.renders(), 1);
}

#[tokio::test]
async fn test_config_beats_existing_attribute() {
    let app = TestApp::new();
    let element = app.insert("div", &[("constrain-selector", "window")]);

    let config = PlugConfig::new().with("selector", "#x");
    let plugin = element.plug(NAMESPACE, Some(&config), None).unwrap();
    assert_eq!(plugin.get("selector"), Some(AttrValue::from("#x")));
}

#[tokio::test]
async fn test_schema_default_fills_fresh_element() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);

    let plugin = element.plug(NAMESPACE, None, None).unwrap();
    assert_eq!(ConstrainPlugin::selector(&plugin), "window");
    assert_eq!(
        element.outer_html(),
        r#"<div plugin-constrain="true" constrain-selector="window" constrain-ready="true"></div>"#
    );
}

#[tokio::test(start_paused = true)]
async fn test_model_round_trips_to_attribute() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);
    let plugin = element.plug(NAMESPACE, None, None).unwrap();
    assert_eq!(element.get_attr("constrain-selector").as_deref(), Some("window"));

    plugin.model().set("selector", "dummy");
    settle().await;
    advance(500).await;
    assert_eq!(element.get_attr("constrain-selector").as_deref(), Some("dummy"));
}

#[tokio::test]
async fn test_unplug_removes_every_namespaced_attribute() {
    let app = TestApp::new();
    let element = app.insert("div", &[("id", "target")]);
    element.plug(NAMESPACE, None, None).unwrap();

    element.unplug(NAMESPACE);
    for name in ["constrain-selector", "plugin-constrain", "constrain-ready"] {
        assert!(!element.has_attr(name), "{name} left behind");
    }
    assert_eq!(element.get_attr("id").as_deref(), Some("target"));
}

#[tokio::test]
async fn test_pre_rendered_markup_is_not_rendered_again() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let element = app.insert(
        "div",
        &[("counted-ready", "true"), ("counted-selector", "#kept")],
    );

    let plugin = element.plug("counted", None, None).unwrap();
    assert_eq!(counts.renders(), 0);
    assert_eq!(counts.syncs(), 1);
    assert_eq!(plugin.get("selector"), Some(AttrValue::from("#kept")));
    assert_eq!(plugin.state(), LifecycleState::Rendered);
}

#[tokio::test]
async fn test_shared_model_drives_several_elements() {
    let app = TestApp::new();
    let model = Model::from_values([("selector", "#shared")]);
    let a = app.insert("div", &[]);
    let b = app.insert("div", &[]);

    a.plug(NAMESPACE, None, Some(model.clone())).unwrap();
    b.plug(NAMESPACE, None, Some(model.clone())).unwrap();

    model.set("selector", "#moved");
    settle().await;
    assert_eq!(a.get_attr("constrain-selector").as_deref(), Some("#moved"));
    assert_eq!(b.get_attr("constrain-selector").as_deref(), Some("#moved"));
}

#[tokio::test]
async fn test_get_plugin_resolves_after_declarative_plug() {
    let app = TestApp::new();
    let element = app.insert("div", &[("plugin-constrain", "true")]);
    assert!(!element.is_plugged(NAMESPACE));

    let plugin = tokio::time::timeout(Duration::from_secs(1), element.get_plugin(NAMESPACE))
        .await
        .expect("plugin became ready")
        .expect("plugin present");
    assert!(plugin.is_ready());
    assert_eq!(element.get_attr("constrain-ready").as_deref(), Some("true"));
}
