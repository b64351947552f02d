//! Client-side attribute cache.

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{TimeSource, Timestamp};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A cached attribute value and the time it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: Value,
    pub timestamp: Timestamp,
}

/// Cache of attribute values consulted by proxies before asking the provider.
pub trait ClientCache: Send + Sync {
    fn lookup(&self, attribute_id: &str) -> Option<CachedValue>;
    fn insert(&self, attribute_id: String, value: Value);
}

/// Bounded cache evicting the least recently used attribute.
pub struct ClientQCache {
    entries: Mutex<LruCache<String, CachedValue>>,
    time: Arc<dyn TimeSource>,
}

impl ClientQCache {
    pub fn new(capacity: usize, time: Arc<dyn TimeSource>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            time,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ClientCache for ClientQCache {
    fn lookup(&self, attribute_id: &str) -> Option<CachedValue> {
        self.entries.lock().get(attribute_id).cloned()
    }

    fn insert(&self, attribute_id: String, value: Value) {
        let timestamp = self.time.now();
        self.entries
            .lock()
            .put(attribute_id, CachedValue { value, timestamp });
    }
}
