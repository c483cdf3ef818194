//! In-process publish/subscribe keyed by event type.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

/// A subscriber callback.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies one registration made with [`EventEmitter::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event emitter with exact-match subscriptions.
///
/// `emit` is synchronous and never queues. The handler set is snapshotted
/// before dispatch, so a handler may call `on`/`off` on the same emitter.
/// A panicking handler unwinds through `emit`.
#[derive(Default)]
pub struct EventEmitter {
    handlers: RwLock<HashMap<String, Vec<(SubscriptionId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    /// Create an emitter with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`.
    pub fn on<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_handler(event_type, Arc::new(handler))
    }

    /// Register an already shared handler for `event_type`.
    pub fn on_handler(&self, event_type: &str, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a registration. No-op if it is not present.
    pub fn off(&self, event_type: &str, id: SubscriptionId) {
        let mut handlers = self.handlers.write();
        if let Some(list) = handlers.get_mut(event_type) {
            list.retain(|(existing, _)| *existing != id);
            if list.is_empty() {
                handlers.remove(event_type);
            }
        }
    }

    /// Invoke every handler registered for `event_type`.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event_type: &str, data: &Value) -> usize {
        let snapshot: Vec<EventHandler> = match self.handlers.read().get(event_type) {
            Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
            None => return 0,
        };

        trace!(event_type, handlers = snapshot.len(), "Emitting event");
        for handler in &snapshot {
            handler(data);
        }
        snapshot.len()
    }

    /// Number of handlers currently registered for `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.read().get(event_type).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut types: Vec<_> = handlers.keys().collect();
        types.sort();
        f.debug_struct("EventEmitter")
            .field("event_types", &types)
            .finish()
    }
}
