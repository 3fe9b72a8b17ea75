//! Observable key/value model shared between a plugin and its callers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use nodeplug_core::AppResult;
use nodeplug_core::types::ObserverId;

use crate::codec::AttrValue;

/// One key write on a [`Model`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChange {
    /// The key written.
    pub key: String,
    /// Value before the write.
    pub old: Option<AttrValue>,
    /// Value after the write; `None` when the key was removed.
    pub new: Option<AttrValue>,
}

/// Callback invoked after every model change.
pub type ModelObserver = Arc<dyn Fn(&ModelChange) + Send + Sync>;

#[derive(Default)]
struct ModelInner {
    values: RwLock<BTreeMap<String, AttrValue>>,
    observers: RwLock<Vec<(ObserverId, ModelObserver)>>,
}

/// Shared, observable model. Clones refer to the same storage.
#[derive(Clone, Default)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a model holding `values`.
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let model = Self::new();
        {
            let mut map = model.write_values();
            for (key, value) in values {
                map.insert(key.into(), value.into());
            }
        }
        model
    }

    pub fn get(&self, key: &str) -> Option<AttrValue> {
        self.read_values().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read_values().contains_key(key)
    }

    /// Writes a key. Observers run only when the stored value changed.
    pub fn set(&self, key: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        let old = {
            let mut map = self.write_values();
            if map.get(key) == Some(&value) {
                return;
            }
            map.insert(key.to_string(), value.clone())
        };
        self.notify(ModelChange {
            key: key.to_string(),
            old,
            new: Some(value),
        });
    }

    /// Writes a key only when it is absent. Returns whether it was written.
    pub fn insert_if_absent(&self, key: &str, value: impl Into<AttrValue>) -> bool {
        let value = value.into();
        {
            let mut map = self.write_values();
            if map.contains_key(key) {
                return false;
            }
            map.insert(key.to_string(), value.clone());
        }
        self.notify(ModelChange {
            key: key.to_string(),
            old: None,
            new: Some(value),
        });
        true
    }

    /// Removes a key, returning its value.
    pub fn remove(&self, key: &str) -> Option<AttrValue> {
        let old = self.write_values().remove(key)?;
        self.notify(ModelChange {
            key: key.to_string(),
            old: Some(old.clone()),
            new: None,
        });
        Some(old)
    }

    /// Copies every key of `other` that this model lacks. Does not notify.
    pub fn merge_missing_from(&self, other: &Model) {
        if self.ptr_eq(other) {
            return;
        }
        let source = other.snapshot();
        let mut map = self.write_values();
        for (key, value) in source {
            map.entry(key).or_insert(value);
        }
    }

    /// Copy of all values.
    pub fn snapshot(&self) -> BTreeMap<String, AttrValue> {
        self.read_values().clone()
    }

    /// The model as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }

    /// Subscribes to changes.
    pub fn observe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&ModelChange) + Send + Sync + 'static,
    {
        let id = ObserverId::new();
        self.inner
            .observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(observer)));
        id
    }

    /// Removes a subscription. Returns whether it existed.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.write().unwrap_or_else(|e| e.into_inner());
        let before = observers.len();
        observers.retain(|(entry, _)| *entry != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.inner
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether both handles share the same storage.
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self, change: ModelChange) {
        let observers: Vec<ModelObserver> = self
            .inner
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(&change);
        }
    }

    fn read_values(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, AttrValue>> {
        self.inner.values.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_values(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, AttrValue>> {
        self.inner.values.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Explicit values passed to `plug`. They take precedence over attributes
/// and defaults during hydration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlugConfig {
    values: BTreeMap<String, AttrValue>,
}

impl PlugConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Parses a JSON object such as `{"selector": "#x"}`.
    pub fn from_json(value: serde_json::Value) -> AppResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("values", &*self.read_values())
            .field("observers", &self.observer_count())
            .finish()
    }
}
