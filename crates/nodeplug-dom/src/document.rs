//! Document: owns the node tree, its listeners, and its finalizer.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::trace;

use nodeplug_core::types::{FinalizerId, ListenerId};

use crate::element::Element;
use crate::event::{DomEvent, UiEvent};
use crate::extensions::Extensions;
use crate::finalizer::{FinalizeCallback, Finalized, Finalizer};
use crate::listeners::ListenerRegistry;

pub(crate) struct DocumentInner {
    body: Element,
    listeners: ListenerRegistry,
    finalizer: Finalizer,
    extensions: Extensions,
}

/// Handle to a document. Cloning shares the same document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    /// Creates an empty document with a `<body>` root.
    pub fn new() -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<DocumentInner>| DocumentInner {
            body: Element::new_in(weak.clone(), "body"),
            listeners: ListenerRegistry::new(),
            finalizer: Finalizer::new(),
            extensions: Extensions::new(),
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<DocumentInner>) -> Self {
        Self { inner }
    }

    /// The root element every connected node descends from.
    pub fn body(&self) -> Element {
        self.inner.body.clone()
    }

    /// Creates a detached element owned by this document.
    pub fn create_element(&self, tag: &str) -> Element {
        Element::new_in(Arc::downgrade(&self.inner), tag)
    }

    /// Creates a detached element with initial attributes.
    pub fn create_element_with_attrs(&self, tag: &str, attrs: &[(&str, &str)]) -> Element {
        let element = self.create_element(tag);
        element.set_attrs(attrs.iter().copied(), true);
        element
    }

    /// Per-document extension storage.
    pub fn extensions(&self) -> &Extensions {
        &self.inner.extensions
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Queries ──

    /// All connected elements (body included) matching `predicate`, in document order.
    pub fn query_all<F>(&self, predicate: F) -> Vec<Element>
    where
        F: Fn(&Element) -> bool,
    {
        self.body()
            .subtree()
            .into_iter()
            .filter(|element| predicate(element))
            .collect()
    }

    /// Connected elements carrying every `name="value"` pair.
    pub fn query_by_attrs(&self, attrs: &[(&str, &str)]) -> Vec<Element> {
        self.query_all(|element| {
            attrs
                .iter()
                .all(|(name, value)| element.get_attr(name).as_deref() == Some(*value))
        })
    }

    // ── Events ──

    /// Subscribes to an event type.
    pub fn subscribe<F>(&self, event_type: &str, listener: F) -> ListenerId
    where
        F: Fn(&DomEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.register(event_type, Arc::new(listener))
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.unregister(id)
    }

    /// Registers a finalizer callback, invoked after every dispatch and on IO completion.
    pub fn finalize<F>(&self, callback: F) -> FinalizerId
    where
        F: Fn(&Finalized<'_>) + Send + Sync + 'static,
    {
        let callback: FinalizeCallback = Arc::new(callback);
        self.inner.finalizer.register(callback)
    }

    /// Detaches a finalizer callback.
    pub fn detach_finalizer(&self, id: FinalizerId) -> bool {
        self.inner.finalizer.detach(id)
    }

    /// Runs the listeners for `event`, then the finalizer.
    pub fn dispatch(&self, event: DomEvent) {
        let listeners = self.inner.listeners.get_listeners(event.event_type());
        trace!(
            event_type = event.event_type(),
            listener_count = listeners.len(),
            "Dispatching event"
        );
        for listener in listeners {
            listener(&event);
        }
        self.inner.finalizer.notify(&Finalized::Event(&event));
    }

    /// Dispatches a user-interaction event.
    pub fn dispatch_ui(&self, event: UiEvent) {
        self.dispatch(DomEvent::Ui(event));
    }

    /// Reports that an IO request completed.
    pub fn finalize_io(&self) {
        trace!("Finalizing IO");
        self.inner.finalizer.notify(&Finalized::Io);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("body", &self.inner.body)
            .field("listeners", &self.inner.listeners)
            .field("finalizer", &self.inner.finalizer)
            .finish()
    }
}
