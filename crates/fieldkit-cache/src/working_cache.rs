//! `WorkingCache`: collection values plus an explicit observer list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use serde::de::DeserializeOwned;

use fieldkit_core::errors::FieldkitResult;
use fieldkit_core::models::{Collection, Requisition, UserAccount};

/// Handle returned by [`WorkingCache::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&[Collection]) + Send + Sync>;

/// Session-scoped collection cache.
///
/// Writes replace a collection wholesale and then notify every observer with
/// the set of affected keys, so the UI can refresh without navigation. The
/// observer list is explicit; nothing here knows about sync internals.
pub struct WorkingCache {
    entries: DashMap<Collection, serde_json::Value>,
    observers: RwLock<Vec<(ObserverId, Observer)>>,
    next_observer: AtomicU64,
}

impl WorkingCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    /// Current value of a collection. `None` until hydrated.
    pub fn get(&self, collection: Collection) -> Option<serde_json::Value> {
        self.entries.get(&collection).map(|v| v.clone())
    }

    /// Replace a collection value and notify observers.
    pub fn set(&self, collection: Collection, value: serde_json::Value) {
        self.entries.insert(collection, value);
        self.notify(&[collection]);
    }

    /// Replace several collections, then notify observers once with the
    /// full affected key set.
    pub fn set_many(&self, values: Vec<(Collection, serde_json::Value)>) {
        if values.is_empty() {
            return;
        }
        let keys: Vec<Collection> = values.iter().map(|(c, _)| *c).collect();
        for (collection, value) in values {
            self.entries.insert(collection, value);
        }
        self.notify(&keys);
    }

    /// Whether a collection has been hydrated at least once.
    pub fn is_hydrated(&self, collection: Collection) -> bool {
        self.entries.contains_key(&collection)
    }

    /// Decode a collection into a typed value. `Ok(None)` means not yet
    /// hydrated; a decode failure is a serialization error.
    pub fn decode<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> FieldkitResult<Option<T>> {
        match self.get(collection) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Typed view of the requisitions collection.
    pub fn requisitions(&self) -> FieldkitResult<Option<Vec<Requisition>>> {
        self.decode(Collection::Requisitions)
    }

    /// Typed view of the users collection.
    pub fn users(&self) -> FieldkitResult<Option<Vec<UserAccount>>> {
        self.decode(Collection::Users)
    }

    /// Register a change observer. Observers run synchronously after every
    /// cache mutation, in registration order.
    pub fn subscribe(&self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .expect("observer list poisoned")
            .push((id, observer));
        id
    }

    /// Remove a previously registered observer. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: ObserverId) {
        self.observers
            .write()
            .expect("observer list poisoned")
            .retain(|(oid, _)| *oid != id);
    }

    // The lock is released before invocation so an observer may subscribe,
    // unsubscribe, or write to the cache from inside its callback.
    fn notify(&self, keys: &[Collection]) {
        let observers: Vec<Observer> = {
            let guard = self.observers.read().expect("observer list poisoned");
            guard.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        for observer in observers {
            observer(keys);
        }
    }
}

impl Default for WorkingCache {
    fn default() -> Self {
        Self::new()
    }
}
