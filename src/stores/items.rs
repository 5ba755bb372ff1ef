//! LRU cache of result items, keyed by item hash.

use crate::error::{HubError, Result};
use crate::stores::SubStore;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::num::NonZeroUsize;

/// Serialized form of an [`ItemStore`]; entries run head (most recent) to tail.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ItemDump {
    /// `None` means unbounded.
    #[serde(default, alias = "cap")]
    capacity: Option<usize>,
    #[serde(default, alias = "data")]
    entries: Vec<ItemEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ItemEntry {
    #[serde(alias = "k")]
    key: String,
    #[serde(default, alias = "v")]
    value: Value,
}

/// Bounded key to item cache with most-recently-used ordering.
///
/// Both `get` and `put` of an existing key move it to the head. A `put` that
/// overflows the capacity evicts exactly the tail entry.
pub struct ItemStore {
    cache: LruCache<String, Value>,
    capacity: Option<NonZeroUsize>,
}

fn check_capacity(n: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(n)
        .ok_or_else(|| HubError::InvalidArgument("capacity must be a number greater than 0".into()))
}

impl ItemStore {
    /// An empty, unbounded cache.
    pub fn new() -> Self {
        Self {
            cache: LruCache::unbounded(),
            capacity: None,
        }
    }

    /// An empty cache holding at most `n` entries.
    pub fn with_capacity(n: usize) -> Result<Self> {
        let mut store = Self::new();
        store.set_capacity(n)?;
        Ok(store)
    }

    /// Set the capacity, evicting from the tail until the cache fits.
    pub fn set_capacity(&mut self, n: usize) -> Result<()> {
        let capacity = check_capacity(n)?;
        self.cache.resize(capacity);
        self.capacity = Some(capacity);
        Ok(())
    }

    /// Current capacity, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }

    /// Insert or replace `key` at the head.
    ///
    /// Returns the evicted tail entry, if the insert pushed one out.
    pub fn put(&mut self, key: impl Into<String>, value: Value) -> Option<(String, Value)> {
        let key = key.into();
        if self.cache.contains(&key) {
            self.cache.put(key, value);
            return None;
        }
        self.cache.push(key, value)
    }

    /// Get the value for `key`, promoting it to the head.
    pub fn get(&mut self, key: &str) -> Option<&Value> {
        self.cache.get(key)
    }

    /// Get the value for `key` without touching the order.
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.cache.peek(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cache.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every entry. The capacity goes back to unbounded.
    pub fn reset(&mut self) {
        self.cache = LruCache::unbounded();
        self.capacity = None;
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubStore for ItemStore {
    fn dump(&self) -> Result<Value> {
        let dump = ItemDump {
            capacity: self.capacity(),
            entries: self
                .cache
                .iter()
                .map(|(key, value)| ItemEntry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_value(dump)?)
    }

    fn restore(&mut self, dump: Value) -> Result<()> {
        let dump: ItemDump = serde_json::from_value(dump)
            .map_err(|e| HubError::Deserialization(format!("items dump: {e}")))?;
        let capacity = dump.capacity.map(check_capacity).transpose()?;

        self.reset();
        // Insert tail first so the head entry ends up most recent.
        for entry in dump.entries.into_iter().rev() {
            self.cache.put(entry.key, entry.value);
        }
        if let Some(capacity) = capacity {
            self.set_capacity(capacity.get())?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
