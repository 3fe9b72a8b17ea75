//! # nodeplug-plugin
//!
//! Plugin framework for NodePlug. Provides:
//!
//! - Attribute codec between typed model values and namespaced attributes
//! - Plugin definitions, classes, and a namespace-keyed registry
//! - Plugin instance lifecycle (hydrate, construct, render once, sync, destroy)
//! - Sync scheduling with burst coalescing for high-frequency events
//! - A lifecycle bridge plugging/unplugging in reaction to DOM mutations
//! - The [`Pluggable`] capability on elements and the per-document [`PluginHost`]

mod bridge;
pub mod codec;
pub mod definition;
pub mod error;
pub mod host;
pub mod instance;
pub mod model;
pub mod pluggable;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod sync;

mod table;

#[cfg(test)]
mod testing;

pub use codec::{AttrType, AttrValue};
pub use definition::{PluginBehavior, PluginClass, PluginDefinition};
pub use error::PluginError;
pub use host::PluginHost;
pub use instance::{LifecycleState, PluginInstance};
pub use model::{Model, ModelChange, PlugConfig};
pub use pluggable::Pluggable;
pub use registry::PluginRegistry;
pub use scheduler::{Scheduler, TokioScheduler};
