//! Plugin registry: namespace → plugin class.
//!
//! Namespaces are unique for the lifetime of the registry. Definition is
//! first-write-wins: a second definition under the same namespace is refused
//! and the original class stays in place.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{info, warn};

use crate::definition::{PluginClass, PluginDefinition, default_delayed_events};
use crate::error::PluginError;

/// Registry of all defined plugin classes.
#[derive(Debug)]
pub struct PluginRegistry {
    /// Namespace → class.
    classes: DashMap<String, Arc<PluginClass>>,
    /// Delayed-event set root classes start from.
    base_delayed: BTreeSet<String>,
}

impl PluginRegistry {
    /// Creates an empty registry using the built-in delayed-event set.
    pub fn new() -> Self {
        Self::with_delayed_events(default_delayed_events())
    }

    /// Creates an empty registry whose root classes delay `base_delayed`.
    pub fn with_delayed_events(base_delayed: BTreeSet<String>) -> Self {
        Self {
            classes: DashMap::new(),
            base_delayed,
        }
    }

    /// Strips whitespace and checks the namespace is non-empty and hyphen-free.
    pub fn validate_namespace(namespace: &str) -> Result<String, PluginError> {
        let stripped: String = namespace.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped.is_empty() || stripped.contains('-') {
            return Err(PluginError::InvalidNamespace(namespace.to_string()));
        }
        Ok(stripped)
    }

    /// Defines a root class.
    pub fn try_define(&self, definition: PluginDefinition) -> Result<Arc<PluginClass>, PluginError> {
        let namespace = Self::validate_namespace(definition.namespace())?;
        self.insert(namespace, |namespace| {
            PluginClass::build(namespace, definition, &self.base_delayed)
        })
    }

    /// Defines a class inheriting from the class registered under `parent`.
    pub fn try_subclass(
        &self,
        parent: &str,
        definition: PluginDefinition,
    ) -> Result<Arc<PluginClass>, PluginError> {
        let namespace = Self::validate_namespace(definition.namespace())?;
        let parent = self
            .get(parent)
            .ok_or_else(|| PluginError::NotRegistered(parent.to_string()))?;
        self.insert(namespace, |namespace| {
            PluginClass::derive(namespace, parent, definition)
        })
    }

    /// Defines a root class, logging instead of failing.
    ///
    /// Returns the existing class on a duplicate namespace and `None` on an
    /// invalid one.
    pub fn define(&self, definition: PluginDefinition) -> Option<Arc<PluginClass>> {
        let namespace = definition.namespace().to_string();
        self.resolve(&namespace, self.try_define(definition))
    }

    /// Subclass counterpart of [`PluginRegistry::define`].
    pub fn subclass(&self, parent: &str, definition: PluginDefinition) -> Option<Arc<PluginClass>> {
        let namespace = definition.namespace().to_string();
        self.resolve(&namespace, self.try_subclass(parent, definition))
    }

    /// Gets a class by namespace.
    pub fn get(&self, namespace: &str) -> Option<Arc<PluginClass>> {
        self.classes.get(namespace).map(|entry| entry.value().clone())
    }

    /// Checks whether a namespace is defined.
    pub fn contains(&self, namespace: &str) -> bool {
        self.classes.contains_key(namespace)
    }

    /// All defined namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> =
            self.classes.iter().map(|entry| entry.key().clone()).collect();
        namespaces.sort();
        namespaces
    }

    /// Returns class count.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn insert<F>(&self, namespace: String, build: F) -> Result<Arc<PluginClass>, PluginError>
    where
        F: FnOnce(String) -> PluginClass,
    {
        match self.classes.entry(namespace.clone()) {
            Entry::Occupied(_) => Err(PluginError::DuplicateNamespace(namespace)),
            Entry::Vacant(slot) => {
                let class = Arc::new(build(namespace));
                info!(
                    namespace = %class.namespace(),
                    parent = ?class.parent().map(|parent| parent.namespace()),
                    schema = ?class.schema().keys().collect::<Vec<_>>(),
                    "Plugin class defined"
                );
                slot.insert(class.clone());
                Ok(class)
            }
        }
    }

    pub(crate) fn resolve(
        &self,
        namespace: &str,
        result: Result<Arc<PluginClass>, PluginError>,
    ) -> Option<Arc<PluginClass>> {
        match result {
            Ok(class) => Some(class),
            Err(PluginError::DuplicateNamespace(ns)) => {
                warn!(namespace = %ns, "Plugin namespace already defined; keeping the original class");
                self.get(&ns)
            }
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Plugin definition refused");
                None
            }
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
