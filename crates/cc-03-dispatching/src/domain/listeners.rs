//! Attribute change listeners of a local provider.
//!
//! Providers notify here when an attribute or broadcast changes; the
//! publication manager registers one listener per active subscription.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Receives the new values of an attribute or broadcast.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, values: &[Value]);
}

/// Opaque handle returned by [`ProviderListeners::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

#[derive(Default)]
pub struct ProviderListeners {
    listeners: RwLock<HashMap<String, HashMap<ListenerHandle, Arc<dyn ChangeListener>>>>,
    next_handle: AtomicU64,
}

impl ProviderListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, name: &str, listener: Arc<dyn ChangeListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(name.to_string())
            .or_default()
            .insert(handle, listener);
        handle
    }

    pub fn remove_listener(&self, name: &str, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write();
        let Some(for_name) = listeners.get_mut(name) else {
            return false;
        };
        let removed = for_name.remove(&handle).is_some();
        if for_name.is_empty() {
            listeners.remove(name);
        }
        removed
    }

    /// Call every listener registered for `name`.
    pub fn notify(&self, name: &str, values: &[Value]) {
        let targets: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .read()
            .get(name)
            .map(|for_name| for_name.values().cloned().collect())
            .unwrap_or_default();
        trace!(name = %name, listeners = targets.len(), "notifying change listeners");
        for listener in targets {
            listener.on_change(values);
        }
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().get(name).map_or(0, HashMap::len)
    }
}
