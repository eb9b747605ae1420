//! `MockRemote`: an in-memory remote store with fault injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use fieldkit_core::errors::{FieldkitResult, SyncError};
use fieldkit_core::models::Collection;
use fieldkit_remote::{ChangeHandler, CollectionEnvelope, ConnectionListener, RemoteStore};

/// In-memory `RemoteStore` for tests.
///
/// Starts connected and authenticated. Supports injected get latency (for
/// timeout and single-flight tests), forced set failures, change emission,
/// and connectivity flips that fire the installed listener.
pub struct MockRemote {
    entries: Mutex<HashMap<Collection, CollectionEnvelope>>,
    handlers: Mutex<HashMap<Collection, ChangeHandler>>,
    listener: Mutex<Option<ConnectionListener>>,
    connected: AtomicBool,
    auth_ready: AtomicBool,
    fail_sets: AtomicBool,
    get_latency: Mutex<Option<Duration>>,
    get_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    set_log: Mutex<Vec<Collection>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
            listener: Mutex::new(None),
            connected: AtomicBool::new(true),
            auth_ready: AtomicBool::new(true),
            fail_sets: AtomicBool::new(false),
            get_latency: Mutex::new(None),
            get_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            set_log: Mutex::new(Vec::new()),
        }
    }

    /// Seed a collection as written by `writer_id` right now.
    pub fn seed(&self, collection: Collection, payload: serde_json::Value, writer_id: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(collection, CollectionEnvelope::now(payload, writer_id));
    }

    /// Current stored envelope, if any.
    pub fn envelope(&self, collection: Collection) -> Option<CollectionEnvelope> {
        self.entries.lock().unwrap().get(&collection).cloned()
    }

    /// Flip connectivity and fire the installed listener.
    pub fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(connected, was);
        }
    }

    pub fn set_auth_ready(&self, ready: bool) {
        self.auth_ready.store(ready, Ordering::SeqCst);
    }

    /// Make every subsequent `set` fail with a transport error.
    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// Delay every `get` by `latency`, to exercise timeouts and overlap.
    pub fn set_get_latency(&self, latency: Option<Duration>) {
        *self.get_latency.lock().unwrap() = latency;
    }

    /// Deliver a change to the currently subscribed handler, if any.
    /// Returns whether a handler was invoked.
    pub fn emit_change(&self, collection: Collection, envelope: CollectionEnvelope) -> bool {
        let handler = self.handlers.lock().unwrap().get(&collection).cloned();
        match handler {
            Some(handler) => {
                handler(envelope);
                true
            }
            None => false,
        }
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Number of distinct collections with a live handler.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    /// Collections written through `set`, in order.
    pub fn set_log(&self) -> Vec<Collection> {
        self.set_log.lock().unwrap().clone()
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MockRemote {
    async fn get(&self, collection: Collection) -> FieldkitResult<Option<CollectionEnvelope>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.get_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.entries.lock().unwrap().get(&collection).cloned())
    }

    async fn set(
        &self,
        collection: Collection,
        envelope: CollectionEnvelope,
    ) -> FieldkitResult<()> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(SyncError::Transport {
                reason: "injected set failure".to_string(),
            }
            .into());
        }
        self.set_log.lock().unwrap().push(collection);
        self.entries.lock().unwrap().insert(collection, envelope);
        Ok(())
    }

    async fn subscribe(&self, collection: Collection, handler: ChangeHandler) -> FieldkitResult<()> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        // Replaces any prior handler: re-registration never duplicates delivery.
        self.handlers.lock().unwrap().insert(collection, handler);
        Ok(())
    }

    async fn unsubscribe(&self, collection: Collection) -> FieldkitResult<()> {
        self.handlers.lock().unwrap().remove(&collection);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn auth_ready(&self) -> bool {
        self.auth_ready.load(Ordering::SeqCst)
    }

    fn set_connection_listener(&self, listener: ConnectionListener) {
        *self.listener.lock().unwrap() = Some(listener);
    }
}
