//! Listener registry: callbacks registered per event type.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use nodeplug_core::types::ListenerId;

use crate::event::DomEvent;

/// Callback invoked for a dispatched event.
pub type Listener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// Entry in the listener registry.
struct ListenerEntry {
    /// Subscription handle.
    id: ListenerId,
    /// The callback.
    listener: Listener,
}

/// Registry of listeners organized by event type.
#[derive(Default)]
pub struct ListenerRegistry {
    /// Event type → listeners in registration order.
    listeners: RwLock<HashMap<String, Vec<ListenerEntry>>>,
}

impl ListenerRegistry {
    /// Creates a new empty listener registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for an event type.
    pub fn register(&self, event_type: &str, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners
            .entry(event_type.to_string())
            .or_default()
            .push(ListenerEntry { id, listener });

        debug!(event_type, listener_id = %id, "Listener registered");
        id
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let mut found = false;
        for entries in listeners.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            found |= entries.len() != before;
        }

        // Remove empty event entries
        listeners.retain(|_, entries| !entries.is_empty());
        found
    }

    /// Returns all listeners for an event type, in registration order.
    pub fn get_listeners(&self, event_type: &str) -> Vec<Listener> {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners
            .get(event_type)
            .map(|entries| entries.iter().map(|e| e.listener.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the number of listeners registered for an event type.
    pub fn listener_count(&self, event_type: &str) -> usize {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners.get(event_type).map(|entries| entries.len()).unwrap_or(0)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(event_type, entries)| (event_type.as_str(), entries.len()))
            .collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &counts)
            .finish()
    }
}
