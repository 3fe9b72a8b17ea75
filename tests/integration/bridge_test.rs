//! Integration tests for the DOM lifecycle bridge.

use nodeplug_core::config::AppConfig;
use nodeplug_plugin::Pluggable;
use plugin_constrain::NAMESPACE;

use crate::helpers::{TestApp, advance, settle};

#[tokio::test(start_paused = true)]
async fn test_flagged_insert_plugs_on_next_turn() {
    let app = TestApp::new();
    let parent = app.document.create_element("section");
    let child = app
        .document
        .create_element_with_attrs("div", &[("plugin-constrain", "true")]);
    parent.append_child(&child);
    assert!(!child.is_plugged(NAMESPACE));

    app.document.body().append_child(&parent);
    assert!(!child.is_plugged(NAMESPACE));

    settle().await;
    assert!(child.is_plugged(NAMESPACE));
    assert!(!parent.is_plugged(NAMESPACE));
}

#[tokio::test(start_paused = true)]
async fn test_flag_for_unknown_namespace_is_ignored() {
    let app = TestApp::new();
    let element = app.insert("div", &[("plugin-unknown", "true")]);
    settle().await;
    assert!(!element.is_plugged("unknown"));
}

#[tokio::test(start_paused = true)]
async fn test_attribute_flag_plugs_and_unplugs() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);

    element.set_attr("plugin-constrain", "true");
    assert!(!element.is_plugged(NAMESPACE));
    settle().await;
    assert!(element.is_plugged(NAMESPACE));

    element.set_attr("plugin-constrain", "false");
    settle().await;
    assert!(!element.is_plugged(NAMESPACE));
    assert!(!element.has_attr("constrain-selector"));

    element.set_attr("plugin-constrain", "true");
    settle().await;
    assert!(element.is_plugged(NAMESPACE));

    element.remove_attr("plugin-constrain");
    settle().await;
    assert!(!element.is_plugged(NAMESPACE));
}

#[tokio::test(start_paused = true)]
async fn test_flag_toggled_within_one_turn_settles_on_last_value() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);

    element.set_attr("plugin-constrain", "true");
    element.remove_attr("plugin-constrain");
    settle().await;
    assert!(!element.is_plugged(NAMESPACE));
}

#[tokio::test(start_paused = true)]
async fn test_reinsert_within_grace_keeps_plugin() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let element = app.insert("div", &[]);
    element.plug("counted", None, None).unwrap();

    element.remove();
    advance(2_000).await;
    app.document.body().append_child(&element);
    advance(4_000).await;

    assert!(element.is_plugged("counted"));
    assert_eq!(counts.destroys(), 0);
    assert_eq!(counts.renders(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_removal_past_grace_destroys() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let element = app.insert("div", &[]);
    element.plug("counted", None, None).unwrap();

    element.remove();
    advance(4_999).await;
    assert!(element.is_plugged("counted"));

    advance(2).await;
    assert!(!element.is_plugged("counted"));
    assert_eq!(counts.destroys(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_removal_restarts_grace() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);
    element.plug(NAMESPACE, None, None).unwrap();

    element.remove();
    advance(1_000).await;
    app.document.body().append_child(&element);
    advance(1_000).await;
    element.remove();

    advance(3_500).await;
    assert!(element.is_plugged(NAMESPACE));

    advance(2_000).await;
    assert!(!element.is_plugged(NAMESPACE));
}

#[tokio::test(start_paused = true)]
async fn test_grace_period_follows_configuration() {
    let mut config = AppConfig::default();
    config.plugins.removal_grace_ms = 100;
    let app = TestApp::with_config(config);
    let element = app.insert("div", &[]);
    element.plug(NAMESPACE, None, None).unwrap();

    element.remove();
    advance(101).await;
    assert!(!element.is_plugged(NAMESPACE));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_reacting_to_mutations() {
    let app = TestApp::new();
    let element = app.insert("div", &[]);
    element.plug(NAMESPACE, None, None).unwrap();

    app.host.shutdown();
    assert!(!element.is_plugged(NAMESPACE));

    element.set_attr("plugin-constrain", "true");
    settle().await;
    assert!(!element.is_plugged(NAMESPACE));
}
