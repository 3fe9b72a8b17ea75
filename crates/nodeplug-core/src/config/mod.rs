//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from an
//! optional TOML file overlaid with `NODEPLUG__*` environment variables.
//! Every field has a default, so an empty source yields a usable config.

pub mod logging;
pub mod plugin;
pub mod scheduler;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::plugin::PluginConfig;
pub use self::scheduler::SchedulerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Plugin lifecycle settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// Sync scheduling settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// Environment variables use the `NODEPLUG` prefix with `__` as the
    /// section separator, e.g. `NODEPLUG__PLUGINS__REMOVAL_GRACE_MS=2000`.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("NODEPLUG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.plugins.removal_grace_ms >= self.plugins.node_retention_ms {
            return Err(AppError::configuration(format!(
                "plugins.removal_grace_ms ({}) must be smaller than plugins.node_retention_ms ({})",
                self.plugins.removal_grace_ms, self.plugins.node_retention_ms
            )));
        }
        if self.scheduler.delayed_sync_ms == 0 {
            return Err(AppError::configuration(
                "scheduler.delayed_sync_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}
