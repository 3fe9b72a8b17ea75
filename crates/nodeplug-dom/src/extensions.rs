//! Type-keyed storage attached to nodes and documents.
//!
//! Higher layers keep their per-node bookkeeping here (a plugin table, a
//! removal counter) instead of the substrate knowing about them.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// A map holding at most one value per type.
#[derive(Default)]
pub struct Extensions {
    /// Type → shared value.
    map: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Extensions {
    /// Creates an empty extension map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored for `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Stores `value`, returning the previous value for `T`.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
    }

    /// Returns the value for `T`, creating it with `init` when missing.
    pub fn get_or_insert_with<T, F>(&self, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>() {
            return existing;
        }
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        let entry = map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(init()))
            .clone();
        match entry.downcast::<T>() {
            Ok(value) => value,
            Err(_) => unreachable!("extension stored under the TypeId of another type"),
        }
    }

    /// Removes and returns the value for `T`.
    pub fn remove<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.map.read().map(|map| map.len()).unwrap_or(0);
        f.debug_struct("Extensions").field("len", &len).finish()
    }
}
