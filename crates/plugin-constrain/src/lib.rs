//! Constrain plugin for NodePlug.
//!
//! Declares a single `selector` attribute naming the container an element
//! is constrained to (`window` by default). Positioning itself is left to
//! whoever consumes the model; the plugin only keeps the selector in sync
//! between markup and model.

pub mod plugin;

pub use plugin::{ConstrainBehavior, ConstrainPlugin, NAMESPACE};
