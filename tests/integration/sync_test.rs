//! Integration tests for sync scheduling.

use std::sync::Arc;

use nodeplug_core::config::AppConfig;
use nodeplug_dom::UiEvent;
use nodeplug_plugin::{AttrValue, PluginDefinition, Pluggable};

use crate::helpers::{CountingBehavior, HookCounts, TestApp, advance, settle};

#[tokio::test(start_paused = true)]
async fn test_scroll_burst_yields_single_sync() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let element = app.insert("div", &[]);
    element.plug("counted", None, None).unwrap();
    let baseline = counts.syncs();

    for _ in 0..25 {
        app.document.dispatch_ui(UiEvent::new("scroll").with_target(&element));
        advance(10).await;
    }
    advance(500).await;
    assert_eq!(counts.syncs(), baseline + 1);
}

#[tokio::test(start_paused = true)]
async fn test_blur_syncs_immediately() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let element = app.insert("div", &[]);
    element.plug("counted", None, None).unwrap();
    let baseline = counts.syncs();

    app.document.dispatch_ui(UiEvent::new("blur").with_target(&element));
    assert_eq!(counts.syncs(), baseline + 1);
}

#[tokio::test(start_paused = true)]
async fn test_io_completion_resyncs_every_instance() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let a = app.insert("div", &[]);
    let b = app.insert("div", &[]);
    a.plug("counted", None, None).unwrap();
    b.plug("counted", None, None).unwrap();
    let baseline = counts.syncs();

    app.document.finalize_io();
    assert_eq!(counts.syncs(), baseline + 2);
}

#[tokio::test(start_paused = true)]
async fn test_attribute_writes_do_not_trigger_sync() {
    let app = TestApp::new();
    let counts = app.define_counting("counted");
    let element = app.insert("div", &[]);
    element.plug("counted", None, None).unwrap();
    let baseline = counts.syncs();

    element.set_attr("title", "hello");
    app.document
        .dispatch_ui(UiEvent::new("mousedownoutside").with_target(&element));
    app.document
        .dispatch_ui(UiEvent::new("click").with_target(&element).prevent_render());
    advance(1_000).await;
    assert_eq!(counts.syncs(), baseline);
}

#[tokio::test(start_paused = true)]
async fn test_configured_delayed_events_replace_defaults() {
    let mut config = AppConfig::default();
    config.scheduler.delayed_events = Some(vec!["click".into(), "blur".into()]);
    config.scheduler.delayed_sync_ms = 200;
    let app = TestApp::with_config(config);
    let counts = app.define_counting("counted");
    let element = app.insert("div", &[]);
    element.plug("counted", None, None).unwrap();
    let baseline = counts.syncs();

    app.document.dispatch_ui(UiEvent::new("scroll"));
    assert_eq!(counts.syncs(), baseline + 1);

    app.document.dispatch_ui(UiEvent::new("click"));
    app.document.dispatch_ui(UiEvent::new("click"));
    assert_eq!(counts.syncs(), baseline + 1);
    advance(201).await;
    assert_eq!(counts.syncs(), baseline + 2);

    app.document.dispatch_ui(UiEvent::new("blur"));
    assert_eq!(counts.syncs(), baseline + 3);
}

#[tokio::test(start_paused = true)]
async fn test_direct_event_response_per_class() {
    let app = TestApp::new();
    let counts = Arc::new(HookCounts::default());
    app.host
        .try_define_plugin(
            PluginDefinition::new("typing")
                .direct_event_response(["keydown", "keyupoutside"])
                .behavior(CountingBehavior(counts.clone())),
        )
        .unwrap();
    let element = app.insert("input", &[]);
    element.plug("typing", None, None).unwrap();
    let baseline = counts.syncs();

    app.document.dispatch_ui(UiEvent::new("keydown"));
    app.document.dispatch_ui(UiEvent::new("keyup"));
    assert_eq!(counts.syncs(), baseline + 2);

    app.document.dispatch_ui(UiEvent::new("keypress"));
    assert_eq!(counts.syncs(), baseline + 2);
    advance(501).await;
    assert_eq!(counts.syncs(), baseline + 3);
}

#[tokio::test(start_paused = true)]
async fn test_model_writes_before_ready_do_not_sync() {
    let app = TestApp::new();
    let counts = Arc::new(HookCounts::default());
    app.host
        .try_define_plugin(
            PluginDefinition::new("eager")
                .constructor(|plugin, _| plugin.set("selector", "#from-constructor"))
                .behavior(CountingBehavior(counts.clone())),
        )
        .unwrap();
    let element = app.insert("div", &[]);
    let plugin = element.plug("eager", None, None).unwrap();
    assert_eq!(counts.syncs(), 1);

    settle().await;
    assert_eq!(counts.syncs(), 1);
    assert_eq!(plugin.get("selector"), Some(AttrValue::from("#from-constructor")));
}
