//! DOM lifecycle bridge: plugs and unplugs in reaction to mutations.
//!
//! Every reaction runs on a later turn, never inside the dispatch that
//! triggered it, and re-reads the element's current state when it runs.
//! Node removal waits out the grace period first so elements that are
//! moved (removed and re-inserted) keep their plugins.

use tracing::debug;

use nodeplug_core::types::ListenerId;
use nodeplug_dom::event::{
    ATTRIBUTE_CHANGE, ATTRIBUTE_INSERT, ATTRIBUTE_REMOVE, NODE_INSERT, NODE_REMOVE,
};
use nodeplug_dom::{DomEvent, Element};

use crate::codec::{plugged_attr, plugged_namespace};
use crate::host::PluginHost;
use crate::table::RemovalEpoch;

type Reaction = fn(&PluginHost, &DomEvent);

/// Subscribes the bridge to the host's document.
pub(crate) fn install(host: &PluginHost) -> Vec<ListenerId> {
    let reactions: [(&str, Reaction); 5] = [
        (NODE_INSERT, on_node_inserted),
        (NODE_REMOVE, on_node_removed),
        (ATTRIBUTE_INSERT, on_attributes_written),
        (ATTRIBUTE_CHANGE, on_attributes_written),
        (ATTRIBUTE_REMOVE, on_attributes_removed),
    ];

    reactions
        .into_iter()
        .map(|(event_type, reaction)| {
            let weak = host.downgrade();
            host.document().subscribe(event_type, move |event| {
                if let Some(host) = weak.upgrade() {
                    reaction(&host, event);
                }
            })
        })
        .collect()
}

/// Namespaces `element` is flagged for with `plugin-<ns>="true"`.
pub(crate) fn flagged_namespaces(element: &Element) -> Vec<String> {
    element
        .attrs()
        .into_iter()
        .filter(|(_, value)| value == "true")
        .filter_map(|(name, _)| plugged_namespace(&name).map(String::from))
        .collect()
}

fn is_flagged(element: &Element, namespace: &str) -> bool {
    element.get_attr(&plugged_attr(namespace)).as_deref() == Some("true")
}

fn on_node_inserted(host: &PluginHost, event: &DomEvent) {
    let DomEvent::NodeInserted { target } = event else {
        return;
    };
    let element = target.clone();
    let weak = host.downgrade();
    host.scheduler().defer(Box::new(move || {
        let Some(host) = weak.upgrade() else {
            return;
        };
        for namespace in flagged_namespaces(&element) {
            if host.is_plugged(&element, &namespace) {
                continue;
            }
            if host.registry().contains(&namespace) {
                debug!(namespace = %namespace, node = %element.id(), "Plug due to node insert");
                host.plug(&element, &namespace, None, None);
            }
        }
    }));
}

fn on_node_removed(host: &PluginHost, event: &DomEvent) {
    let DomEvent::NodeRemoved { target } = event else {
        return;
    };
    let element = target.clone();
    let epoch = RemovalEpoch::of(&element).bump();
    let weak = host.downgrade();
    host.scheduler().later(
        host.removal_grace(),
        Box::new(move || {
            let Some(host) = weak.upgrade() else {
                return;
            };
            if element.is_connected() || RemovalEpoch::of(&element).current() != epoch {
                debug!(node = %element.id(), "Node came back within the grace period");
                return;
            }
            for namespace in flagged_namespaces(&element) {
                if host.unplug(&element, &namespace) {
                    debug!(namespace = %namespace, node = %element.id(), "Unplug due to node removal");
                }
            }
        }),
    );
}

fn on_attributes_written(host: &PluginHost, event: &DomEvent) {
    let (DomEvent::AttributeInserted { target, changed }
    | DomEvent::AttributeChanged { target, changed }) = event
    else {
        return;
    };
    let namespaces: Vec<String> = changed
        .iter()
        .filter_map(|change| plugged_namespace(&change.attribute).map(String::from))
        .collect();
    if namespaces.is_empty() {
        return;
    }

    let element = target.clone();
    let weak = host.downgrade();
    host.scheduler().defer(Box::new(move || {
        let Some(host) = weak.upgrade() else {
            return;
        };
        for namespace in namespaces {
            let plugged = host.is_plugged(&element, &namespace);
            if is_flagged(&element, &namespace) {
                if !plugged && host.registry().contains(&namespace) {
                    debug!(namespace = %namespace, node = %element.id(), "Plug due to attribute change");
                    host.plug(&element, &namespace, None, None);
                }
            } else if plugged {
                debug!(namespace = %namespace, node = %element.id(), "Unplug due to attribute change");
                host.unplug(&element, &namespace);
            }
        }
    }));
}

fn on_attributes_removed(host: &PluginHost, event: &DomEvent) {
    let DomEvent::AttributeRemoved { target, removed } = event else {
        return;
    };
    let namespaces: Vec<String> = removed
        .iter()
        .filter_map(|name| plugged_namespace(name).map(String::from))
        .collect();
    if namespaces.is_empty() {
        return;
    }

    let element = target.clone();
    let weak = host.downgrade();
    host.scheduler().defer(Box::new(move || {
        let Some(host) = weak.upgrade() else {
            return;
        };
        for namespace in namespaces {
            if !is_flagged(&element, &namespace) && host.unplug(&element, &namespace) {
                debug!(namespace = %namespace, node = %element.id(), "Unplug due to attribute removal");
            }
        }
    }));
}
