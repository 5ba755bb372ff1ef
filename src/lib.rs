//! # Gallery State
//!
//! Client-side application state for a media browsing UI: one observable
//! state tree, serializable sub-stores beside it, and an action layer that
//! pages through search results.
//!
//! ## Core Concepts
//!
//! - **Hub**: The state tree (addressed by dot-paths), sub-store registry and
//!   action dispatcher. Many mutations in one scheduler turn coalesce into a
//!   single change notification.
//! - **Sub-stores**: Independent state modules that dump and restore
//!   alongside the tree (an LRU item cache, a selection set)
//! - **Actions**: Named events (`route`, `search`, `next`,
//!   `toggle:selection`) whose handlers fetch and fold results into state
//! - **Snapshots**: `{state, stores}`, the sole serialized form of a hub
//!
//! ## Example
//!
//! ```ignore
//! use gallery_state::{actions, ApiUrls, Hub, HubConfig, HttpTransport, StoreRegistry};
//!
//! // The hub needs a current-thread runtime.
//! let hub = Hub::new(HubConfig::default(), StoreRegistry::with_defaults())?;
//! hub.inflate(Snapshot::from_json(&initial_state)?)?;
//!
//! let urls = ApiUrls::new("http://localhost:8080/api/")?;
//! actions::install(&hub, Arc::new(HttpTransport::for_api(&urls)))?;
//!
//! // Re-render whenever state changes
//! hub.register(|hub| render(hub.get("items")));
//!
//! hub.dispatch(actions::SEARCH, &[json!(urls.recent().as_str())]);
//! ```

pub mod actions;
pub mod error;
pub mod hub;
pub mod state;
pub mod stores;
pub mod subscriptions;
pub mod transport;
pub mod types;

// Re-exports
pub use actions::{Action, Pager};
pub use error::{HubError, Result};
pub use hub::{Hub, HubConfig, WeakHub};
pub use state::{AsStatePath, PathCache, StatePath};
pub use stores::{
    ItemStore, SelectionStore, SharedStore, StoreRegistry, SubStore, ITEMS_STORE,
    SELECTION_STORE,
};
pub use subscriptions::{
    DropReason, HubEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use transport::{ApiUrls, FetchError, HttpTransport, Method, Response, Transport};
pub use types::*;
