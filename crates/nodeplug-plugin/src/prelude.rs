//! Prelude for convenient imports.

pub use crate::codec::{AttrType, AttrValue};
pub use crate::definition::{PluginBehavior, PluginClass, PluginDefinition};
pub use crate::error::PluginError;
pub use crate::host::PluginHost;
pub use crate::instance::PluginInstance;
pub use crate::model::{Model, PlugConfig};
pub use crate::pluggable::Pluggable;
pub use crate::scheduler::{Scheduler, TokioScheduler};
