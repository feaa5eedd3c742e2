use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

type Handler = Arc<dyn Fn(Value) + Send + Sync>;

struct Entry {
    id: u64,
    handler: Handler,
    one_shot: bool,
}

struct BusInner {
    registry: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

/// In-process publish/subscribe dispatcher keyed by event name.
///
/// One bus per session instance; its lifetime matches the session's. Dispatch
/// is synchronous and in registration order. One-shot subscribers are removed
/// from the registry before invocation, so a handler running inside `publish`
/// can register another one-shot for the same name without being re-invoked
/// in the same cycle.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a durable handler. It stays until `unsubscribe()`.
    pub fn subscribe(
        &self,
        event: &str,
        handler: impl Fn(Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(event, Arc::new(handler), false)
    }

    /// Register a handler that fires once and detaches itself.
    pub fn subscribe_once(
        &self,
        event: &str,
        handler: impl Fn(Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(event, Arc::new(handler), true)
    }

    fn register(&self, event: &str, handler: Handler, one_shot: bool) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .registry
            .lock()
            .entry(event.to_owned())
            .or_default()
            .push(Entry { id, handler, one_shot });
        Subscription {
            inner: Arc::clone(&self.inner),
            event: event.to_owned(),
            id,
        }
    }

    /// Invoke every handler currently registered for `event`, in
    /// registration order. Handlers registered during this call are not
    /// invoked until the next publish.
    pub fn publish(&self, event: &str, payload: Value) {
        let to_call: Vec<Handler> = {
            let mut registry = self.inner.registry.lock();
            match registry.get_mut(event) {
                Some(entries) => {
                    let snapshot = entries.iter().map(|e| Arc::clone(&e.handler)).collect();
                    entries.retain(|e| !e.one_shot);
                    if entries.is_empty() {
                        registry.remove(event);
                    }
                    snapshot
                }
                None => return,
            }
        };

        for handler in to_call {
            handler(payload.clone());
        }
    }

    /// Number of handlers currently registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner
            .registry
            .lock()
            .get(event)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

/// Detach handle returned by the subscribe calls. `unsubscribe()` is
/// idempotent and safe to call after a one-shot handler has auto-removed.
/// Dropping the handle does NOT detach.
pub struct Subscription {
    inner: Arc<BusInner>,
    event: String,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        let mut registry = self.inner.registry.lock();
        if let Some(entries) = registry.get_mut(&self.event) {
            entries.retain(|e| e.id != self.id);
            if entries.is_empty() {
                registry.remove(&self.event);
            }
        }
    }
}
