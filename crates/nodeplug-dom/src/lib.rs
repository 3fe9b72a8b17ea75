//! # nodeplug-dom
//!
//! The DOM substrate plugins attach to. Provides:
//!
//! - `Document` / `Element` handles with attribute get/set/remove, including
//!   a silent mode that suppresses mutation notifications
//! - Node-insert/remove and attribute-insert/change/remove notifications
//! - A finalizer that reports every dispatched event (and IO completion)
//!   once it has been handled
//! - Per-node and per-document extension storage
//! - HTML serialization for inspection

pub mod document;
pub mod element;
pub mod event;
pub mod extensions;
pub mod finalizer;
pub mod listeners;

pub use document::Document;
pub use element::{Element, WeakElement};
pub use event::{AttributeChange, DomEvent, UiEvent};
pub use extensions::Extensions;
pub use finalizer::{Finalized, Finalizer};
pub use listeners::ListenerRegistry;
