//! Serializable sub-stores and the registry that constructs them.
//!
//! A sub-store is an independent unit of state logic owned by exactly one
//! [`Hub`]. It can dump itself to a plain JSON value and restore itself from
//! one, which is what lets it travel inside a [`crate::Snapshot`].
//!
//! Sub-stores are registered by name once, at bootstrap, in a
//! [`StoreRegistry`] that is handed to the hub:
//!
//! ```ignore
//! let mut registry = StoreRegistry::with_defaults();
//! registry.register("notes", |_hub| Ok(NotesStore::default()));
//! let hub = Hub::new(HubConfig::default(), registry)?;
//! ```

mod items;
mod selection;

pub use items::ItemStore;
pub use selection::SelectionStore;

use crate::error::{HubError, Result};
use crate::hub::Hub;
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name of the LRU item cache store.
pub const ITEMS_STORE: &str = "items";

/// Name of the selection store.
pub const SELECTION_STORE: &str = "selection";

/// Contract every sub-store implements.
///
/// `restore(dump())` must reproduce an observably equivalent store.
pub trait SubStore: Any + Send {
    /// Dump to a JSON-serializable value.
    fn dump(&self) -> Result<Value>;

    /// Replace this store's contents from a value produced by `dump`.
    fn restore(&mut self, dump: Value) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A live sub-store instance, shared between the hub and its callers.
pub type SharedStore = Arc<Mutex<dyn SubStore>>;

type StoreFactory = Arc<dyn Fn(&Hub) -> Result<SharedStore> + Send + Sync>;

/// Name to constructor mapping for sub-stores.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the item cache and selection stores.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ITEMS_STORE, |hub| match hub.config().item_capacity {
            Some(capacity) => ItemStore::with_capacity(capacity),
            None => Ok(ItemStore::new()),
        });
        registry.register(SELECTION_STORE, |hub| Ok(SelectionStore::new(hub)));
        registry
    }

    /// Register a constructor. A later registration under the same name
    /// replaces the earlier one.
    pub fn register<S, F>(&mut self, name: impl Into<String>, factory: F)
    where
        S: SubStore,
        F: Fn(&Hub) -> Result<S> + Send + Sync + 'static,
    {
        let factory: StoreFactory = Arc::new(move |hub| {
            let store: SharedStore = Arc::new(Mutex::new(factory(hub)?));
            Ok(store)
        });
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Construct a fresh instance of `name` bound to `hub`.
    pub(crate) fn build(&self, name: &str, hub: &Hub) -> Result<SharedStore> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HubError::UnknownStore(name.to_string()))?;
        factory(hub)
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("names", &self.names())
            .finish()
    }
}
