//! Element handles.
//!
//! An [`Element`] is a cheap, cloneable handle to a node owned by a
//! [`Document`]. Attribute and tree mutations on a connected element raise
//! [`DomEvent`]s through the owning document; the `*_silent` variants and
//! mutations on detached elements do not.

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use tracing::warn;

use nodeplug_core::types::NodeId;

use crate::document::{Document, DocumentInner};
use crate::event::{AttributeChange, DomEvent};
use crate::extensions::Extensions;

pub(crate) struct ElementInner {
    id: NodeId,
    tag: String,
    document: Weak<DocumentInner>,
    /// Attributes in insertion order.
    attrs: RwLock<Vec<(String, String)>>,
    children: RwLock<Vec<Element>>,
    parent: RwLock<Weak<ElementInner>>,
    extensions: Extensions,
}

/// Handle to a DOM element.
#[derive(Clone)]
pub struct Element {
    inner: Arc<ElementInner>,
}

/// Non-owning handle to an element.
#[derive(Clone, Default)]
pub struct WeakElement {
    inner: Weak<ElementInner>,
}

impl WeakElement {
    /// Returns the element if it is still alive.
    pub fn upgrade(&self) -> Option<Element> {
        self.inner.upgrade().map(|inner| Element { inner })
    }
}

impl fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(element) => write!(f, "WeakElement({element:?})"),
            None => write!(f, "WeakElement(<dropped>)"),
        }
    }
}

impl Element {
    pub(crate) fn new_in(document: Weak<DocumentInner>, tag: &str) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                id: NodeId::new(),
                tag: tag.to_lowercase(),
                document,
                attrs: RwLock::new(Vec::new()),
                children: RwLock::new(Vec::new()),
                parent: RwLock::new(Weak::new()),
                extensions: Extensions::new(),
            }),
        }
    }

    /// Unique node identifier.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Lowercased tag name.
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    /// The document that created this element.
    pub fn document(&self) -> Option<Document> {
        self.inner.document.upgrade().map(Document::from_inner)
    }

    /// Per-element extension storage.
    pub fn extensions(&self) -> &Extensions {
        &self.inner.extensions
    }

    /// Creates a non-owning handle.
    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ── Attributes ──

    /// Returns an attribute value.
    pub fn get_attr(&self, name: &str) -> Option<String> {
        let attrs = self.inner.attrs.read().unwrap_or_else(|e| e.into_inner());
        attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    /// Returns whether an attribute is present.
    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    /// Returns all attributes in insertion order.
    pub fn attrs(&self) -> Vec<(String, String)> {
        self.inner
            .attrs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Sets an attribute, notifying listeners when connected.
    pub fn set_attr(&self, name: &str, value: &str) {
        self.set_attrs([(name, value)], false);
    }

    /// Sets an attribute without raising a mutation event.
    pub fn set_attr_silent(&self, name: &str, value: &str) {
        self.set_attrs([(name, value)], true);
    }

    /// Sets several attributes at once.
    ///
    /// Raises at most one `attributeinsert` (for new names) and one
    /// `attributechange` (for names whose value differs) unless `silent`.
    pub fn set_attrs<I, K, V>(&self, attrs: I, silent: bool)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut inserted = Vec::new();
        let mut changed = Vec::new();
        {
            let mut current = self.inner.attrs.write().unwrap_or_else(|e| e.into_inner());
            for (name, value) in attrs {
                let name = name.into();
                let value = value.into();
                match current.iter_mut().find(|(key, _)| *key == name) {
                    Some((_, existing)) if *existing == value => {}
                    Some((_, existing)) => {
                        *existing = value.clone();
                        changed.push(AttributeChange {
                            attribute: name,
                            new_value: value,
                        });
                    }
                    None => {
                        current.push((name.clone(), value.clone()));
                        inserted.push(AttributeChange {
                            attribute: name,
                            new_value: value,
                        });
                    }
                }
            }
        }

        if silent {
            return;
        }
        if !inserted.is_empty() {
            self.emit(DomEvent::AttributeInserted {
                target: self.clone(),
                changed: inserted,
            });
        }
        if !changed.is_empty() {
            self.emit(DomEvent::AttributeChanged {
                target: self.clone(),
                changed,
            });
        }
    }

    /// Removes an attribute, notifying listeners when connected.
    pub fn remove_attr(&self, name: &str) {
        self.remove_attrs([name], false);
    }

    /// Removes an attribute without raising a mutation event.
    pub fn remove_attr_silent(&self, name: &str) {
        self.remove_attrs([name], true);
    }

    /// Removes several attributes, raising one `attributeremove` unless `silent`.
    pub fn remove_attrs<'a, I>(&self, names: I, silent: bool)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut removed = Vec::new();
        {
            let mut current = self.inner.attrs.write().unwrap_or_else(|e| e.into_inner());
            for name in names {
                if let Some(pos) = current.iter().position(|(key, _)| key == name) {
                    current.remove(pos);
                    removed.push(name.to_string());
                }
            }
        }

        if !silent && !removed.is_empty() {
            self.emit(DomEvent::AttributeRemoved {
                target: self.clone(),
                removed,
            });
        }
    }

    // ── Tree ──

    /// Parent element, if attached.
    pub fn parent(&self) -> Option<Element> {
        self.inner
            .parent
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .upgrade()
            .map(|inner| Element { inner })
    }

    /// Child elements in document order.
    pub fn children(&self) -> Vec<Element> {
        self.inner
            .children
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// This element followed by all descendants, depth first.
    pub fn subtree(&self) -> Vec<Element> {
        let mut out = vec![self.clone()];
        for child in self.children() {
            out.extend(child.subtree());
        }
        out
    }

    /// Whether the element is reachable from its document's body.
    pub fn is_connected(&self) -> bool {
        let Some(document) = self.document() else {
            return false;
        };
        let body = document.body();
        let mut current = self.clone();
        loop {
            if current == body {
                return true;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Appends `child`, moving it out of its current parent first.
    ///
    /// Raises `nodeinsert` for the child and each of its descendants when
    /// this element is connected. Appending this element or one of its
    /// ancestors is refused.
    pub fn append_child(&self, child: &Element) {
        if child.is_inclusive_ancestor_of(self) {
            warn!(parent = %self.id(), child = %child.id(), "Refusing to append an ancestor");
            return;
        }
        if let Some(old_parent) = child.parent() {
            old_parent.remove_child(child);
        }

        {
            let mut children = self.inner.children.write().unwrap_or_else(|e| e.into_inner());
            children.push(child.clone());
        }
        *child.inner.parent.write().unwrap_or_else(|e| e.into_inner()) =
            Arc::downgrade(&self.inner);

        if self.is_connected() {
            for node in child.subtree() {
                self.emit(DomEvent::NodeInserted { target: node });
            }
        }
    }

    fn is_inclusive_ancestor_of(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Removes `child`. Returns `false` if it is not a child of this element.
    ///
    /// Raises `noderemove` for the child and each of its descendants when
    /// this element is connected.
    pub fn remove_child(&self, child: &Element) -> bool {
        let was_connected = self.is_connected();
        {
            let mut children = self.inner.children.write().unwrap_or_else(|e| e.into_inner());
            match children.iter().position(|c| c == child) {
                Some(pos) => {
                    children.remove(pos);
                }
                None => return false,
            }
        }
        *child.inner.parent.write().unwrap_or_else(|e| e.into_inner()) = Weak::new();

        if was_connected {
            for node in child.subtree() {
                self.emit(DomEvent::NodeRemoved { target: node });
            }
        }
        true
    }

    /// Detaches this element from its parent.
    pub fn remove(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove_child(self),
            None => false,
        }
    }

    /// Serializes the element and its subtree.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag());
        for (name, value) in self.attrs() {
            out.push(' ');
            out.push_str(&name);
            out.push_str("=\"");
            out.push_str(&escape_attr(&value));
            out.push('"');
        }
        out.push('>');
        for child in self.children() {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(self.tag());
        out.push('>');
    }

    /// Dispatches a mutation event if this element is connected.
    fn emit(&self, event: DomEvent) {
        if !self.is_connected() {
            return;
        }
        if let Some(document) = self.document() {
            document.dispatch(event);
        }
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .finish()
    }
}
