//! Events dispatched by a [`Document`](crate::Document).
//!
//! Mutation events are raised by the substrate itself whenever a connected
//! node is inserted/removed or its attributes change (unless the write was
//! silent). UI events are raised by callers through `Document::dispatch_ui`.

use crate::element::Element;

/// Event type of a node insertion.
pub const NODE_INSERT: &str = "nodeinsert";
/// Event type of a node removal.
pub const NODE_REMOVE: &str = "noderemove";
/// Event type of attributes added to a node.
pub const ATTRIBUTE_INSERT: &str = "attributeinsert";
/// Event type of existing attributes receiving a new value.
pub const ATTRIBUTE_CHANGE: &str = "attributechange";
/// Event type of attributes removed from a node.
pub const ATTRIBUTE_REMOVE: &str = "attributeremove";

/// All mutation event types raised by the substrate.
pub const MUTATION_EVENTS: [&str; 5] = [
    NODE_INSERT,
    NODE_REMOVE,
    ATTRIBUTE_INSERT,
    ATTRIBUTE_CHANGE,
    ATTRIBUTE_REMOVE,
];

/// Returns whether `event_type` names a substrate mutation event.
pub fn is_mutation_event(event_type: &str) -> bool {
    MUTATION_EVENTS.contains(&event_type)
}

/// One attribute written by an insert or change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    /// Attribute name.
    pub attribute: String,
    /// Value after the write.
    pub new_value: String,
}

/// A user-interaction event (click, scroll, keydown, ...).
#[derive(Debug, Clone)]
pub struct UiEvent {
    /// Lowercased event type.
    pub event_type: String,
    /// Element the event was dispatched on, if any.
    pub target: Option<Element>,
    /// Set when a handler asked for the event not to cause re-rendering.
    pub render_prevented: bool,
}

impl UiEvent {
    /// Creates a new event without a target.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into().to_lowercase(),
            target: None,
            render_prevented: false,
        }
    }

    /// Sets the event target.
    pub fn with_target(mut self, target: &Element) -> Self {
        self.target = Some(target.clone());
        self
    }

    /// Marks the event so that finalizers do not re-render because of it.
    pub fn prevent_render(mut self) -> Self {
        self.render_prevented = true;
        self
    }
}

/// Everything a document can dispatch.
#[derive(Debug, Clone)]
pub enum DomEvent {
    /// A node (and each of its descendants, in separate events) entered the document.
    NodeInserted {
        /// The inserted element.
        target: Element,
    },
    /// A node (and each of its descendants, in separate events) left the document.
    NodeRemoved {
        /// The removed element.
        target: Element,
    },
    /// New attributes were added to a connected node.
    AttributeInserted {
        /// The element whose attributes changed.
        target: Element,
        /// The attributes added.
        changed: Vec<AttributeChange>,
    },
    /// Existing attributes of a connected node received new values.
    AttributeChanged {
        /// The element whose attributes changed.
        target: Element,
        /// The attributes changed.
        changed: Vec<AttributeChange>,
    },
    /// Attributes were removed from a connected node.
    AttributeRemoved {
        /// The element whose attributes were removed.
        target: Element,
        /// Names of the removed attributes.
        removed: Vec<String>,
    },
    /// A user-interaction event.
    Ui(UiEvent),
}

impl DomEvent {
    /// Returns the event type used for listener lookup and sync classification.
    pub fn event_type(&self) -> &str {
        match self {
            Self::NodeInserted { .. } => NODE_INSERT,
            Self::NodeRemoved { .. } => NODE_REMOVE,
            Self::AttributeInserted { .. } => ATTRIBUTE_INSERT,
            Self::AttributeChanged { .. } => ATTRIBUTE_CHANGE,
            Self::AttributeRemoved { .. } => ATTRIBUTE_REMOVE,
            Self::Ui(event) => &event.event_type,
        }
    }

    /// Returns the element the event concerns.
    pub fn target(&self) -> Option<&Element> {
        match self {
            Self::NodeInserted { target }
            | Self::NodeRemoved { target }
            | Self::AttributeInserted { target, .. }
            | Self::AttributeChanged { target, .. }
            | Self::AttributeRemoved { target, .. } => Some(target),
            Self::Ui(event) => event.target.as_ref(),
        }
    }

    /// Returns whether the event was marked as not re-rendering.
    pub fn render_prevented(&self) -> bool {
        match self {
            Self::Ui(event) => event.render_prevented,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_event_type_is_lowercased() {
        let event = UiEvent::new("KeyDown");
        assert_eq!(event.event_type, "keydown");
        assert!(!DomEvent::Ui(event).render_prevented());
    }

    #[test]
    fn test_mutation_event_names() {
        assert!(is_mutation_event("nodeinsert"));
        assert!(is_mutation_event("attributeremove"));
        assert!(!is_mutation_event("scroll"));
    }
}
