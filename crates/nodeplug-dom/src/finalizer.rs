//! Finalizer: one notification per handled interaction.
//!
//! Every event a document dispatches reaches the finalizer after its
//! listeners ran, so subscribers see a single "the DOM has settled"
//! notification per logical interaction. IO completion is reported through
//! the same channel.

use std::fmt;
use std::sync::{Arc, RwLock};

use nodeplug_core::types::FinalizerId;

use crate::event::DomEvent;

/// What a finalizer notification reports.
#[derive(Debug, Clone, Copy)]
pub enum Finalized<'a> {
    /// A dispatched event finished its listener pass.
    Event(&'a DomEvent),
    /// An IO request completed.
    Io,
}

impl Finalized<'_> {
    /// Event type of the finalized event, `"io"` for IO completion.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Event(event) => event.event_type(),
            Self::Io => "io",
        }
    }

    /// Whether the event asked not to re-render.
    pub fn render_prevented(&self) -> bool {
        match self {
            Self::Event(event) => event.render_prevented(),
            Self::Io => false,
        }
    }
}

/// Callback invoked for every finalized event.
pub type FinalizeCallback = Arc<dyn Fn(&Finalized<'_>) + Send + Sync>;

/// Registry of finalizer callbacks.
#[derive(Default)]
pub struct Finalizer {
    /// Registered callbacks in registration order.
    callbacks: RwLock<Vec<(FinalizerId, FinalizeCallback)>>,
}

impl Finalizer {
    /// Creates an empty finalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback.
    pub fn register(&self, callback: FinalizeCallback) -> FinalizerId {
        let id = FinalizerId::new();
        let mut callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        callbacks.push((id, callback));
        id
    }

    /// Detaches a callback. Returns whether it was registered.
    pub fn detach(&self, id: FinalizerId) -> bool {
        let mut callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        let before = callbacks.len();
        callbacks.retain(|(entry, _)| *entry != id);
        callbacks.len() != before
    }

    /// Invokes every callback. Callbacks may register or detach while running.
    pub fn notify(&self, finalized: &Finalized<'_>) {
        let callbacks: Vec<FinalizeCallback> = {
            let callbacks = self.callbacks.read().unwrap_or_else(|e| e.into_inner());
            callbacks.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in callbacks {
            callback(finalized);
        }
    }

    /// Returns the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Returns whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finalizer")
            .field("callbacks", &self.len())
            .finish()
    }
}
