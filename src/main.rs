//! NodePlug demo: plugs the constrain plugin into a small document and
//! walks it through the lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use nodeplug_core::config::AppConfig;
use nodeplug_core::error::AppError;
use nodeplug_dom::{Document, UiEvent};
use nodeplug_plugin::{Model, PlugConfig, Pluggable, PluginHost, TokioScheduler};
use plugin_constrain::{ConstrainPlugin, NAMESPACE};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Demo error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from the file named by `NODEPLUG_CONFIG` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path = std::env::var("NODEPLUG_CONFIG").ok();
    AppConfig::load(config_path.as_deref())
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting NodePlug demo v{}", env!("CARGO_PKG_VERSION"));

    let delayed_sync = config.scheduler.delayed_sync();
    let document = Document::new();
    let scheduler = Arc::new(TokioScheduler::try_current()?);
    let host = PluginHost::install(&document, config, scheduler);
    ConstrainPlugin::new().register(&host)?;

    // ── Declarative: markup flagged before insertion ─────────────
    let declared = document.create_element_with_attrs(
        "div",
        &[("plugin-constrain", "true"), ("constrain-selector", "#main")],
    );
    document.body().append_child(&declared);
    let plugin = declared
        .get_plugin(NAMESPACE)
        .await
        .ok_or_else(|| AppError::internal("declared element was not plugged"))?;
    tracing::info!(html = %declared.outer_html(), "Declared element plugged");

    // ── Imperative: plug with config and a shared model ──────────
    let model = Model::new();
    let panel = document.create_element("section");
    document.body().append_child(&panel);
    let config = PlugConfig::new().with("selector", "#panel");
    panel
        .plug(NAMESPACE, Some(&config), Some(model.clone()))
        .ok_or_else(|| AppError::internal("panel was not plugged"))?;

    model.set("selector", "#sidebar");
    settle().await;
    tracing::info!(html = %panel.outer_html(), "Model change flushed");

    // ── Burst: scrolls collapse into one delayed sync ────────────
    for _ in 0..10 {
        document.dispatch_ui(UiEvent::new("scroll"));
    }
    tokio::time::sleep(delayed_sync + Duration::from_millis(10)).await;

    // ── Teardown ─────────────────────────────────────────────────
    declared.remove_attr("plugin-constrain");
    settle().await;
    tracing::info!(
        plugged = declared.is_plugged(NAMESPACE),
        state = ?plugin.state(),
        html = %declared.outer_html(),
        "Declared element unplugged"
    );

    println!("{}", document.body().outer_html());
    println!("{}", serde_json::to_string_pretty(&model.to_json())?);

    host.shutdown();
    Ok(())
}

/// Gives deferred plugin work a turn to run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
