//! The hub: state tree, sub-store registry and action dispatch in one place.

use crate::error::{HubError, Result};
use crate::state::{self, AsStatePath, PathCache, StatePath};
use crate::stores::{SharedStore, StoreRegistry, SubStore};
use crate::subscriptions::{
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::Snapshot;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, warn};

/// Hub configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Capacity of the item cache when the registry builds it, and again
    /// after each new search resets it. `None` leaves the cache unbounded.
    pub item_capacity: Option<usize>,

    /// Log every dispatched action at debug level.
    pub log_actions: bool,
}

type Listener = Arc<dyn Fn(&Hub) + Send + Sync>;
type ActionHandler = Arc<dyn Fn(&Hub, &[Value]) + Send + Sync>;
type AnyHandler = Arc<dyn Fn(&Hub, &str, &[Value]) + Send + Sync>;

struct HubInner {
    config: HubConfig,
    registry: StoreRegistry,
    runtime: Handle,

    /// Always a JSON object.
    state: RwLock<Value>,
    stores: RwLock<BTreeMap<String, SharedStore>>,
    paths: PathCache,

    listeners: RwLock<Vec<Listener>>,
    handlers: RwLock<HashMap<String, Vec<ActionHandler>>>,
    any_handlers: RwLock<Vec<AnyHandler>>,
    subscriptions: SubscriptionManager,

    /// Raised while a change notification is scheduled but not yet fired.
    dirty: AtomicBool,
    notifications: AtomicU64,
}

/// Observable application state container and event dispatcher.
///
/// A `Hub` is a cheap handle; clones share the same state. All mutation
/// happens synchronously. Any number of state-changing calls made within one
/// scheduler turn produce exactly one notification to [`Hub::register`]
/// callbacks, delivered on a later turn.
///
/// Locks are never held while callbacks, handlers or sub-store closures run,
/// so those may call back into the hub. The one exception: a closure passed
/// to [`Hub::with_store`] must not ask for the same store again.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

/// Non-owning reference to a hub, held by sub-stores.
#[derive(Clone, Default)]
pub struct WeakHub {
    inner: Weak<HubInner>,
}

impl WeakHub {
    pub fn upgrade(&self) -> Option<Hub> {
        self.inner.upgrade().map(|inner| Hub { inner })
    }
}

impl Hub {
    /// Create a hub bound to the current tokio runtime.
    pub fn new(config: HubConfig, registry: StoreRegistry) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| HubError::NoRuntime)?;
        Self::with_runtime(config, registry, runtime)
    }

    /// Create a hub that schedules its tasks on `runtime`.
    ///
    /// `runtime` must be current-thread. On a multi-thread runtime the
    /// notification task could run while the turn that scheduled it is
    /// still mutating, splitting one turn into several notifications.
    pub fn with_runtime(
        config: HubConfig,
        registry: StoreRegistry,
        runtime: Handle,
    ) -> Result<Self> {
        let flavor = runtime.runtime_flavor();
        if flavor != RuntimeFlavor::CurrentThread {
            return Err(HubError::UnsupportedRuntime(format!("{flavor:?}")));
        }
        if config.item_capacity == Some(0) {
            return Err(HubError::InvalidArgument(
                "item_capacity must be a number greater than 0".into(),
            ));
        }

        let log_actions = config.log_actions;
        let hub = Self {
            inner: Arc::new(HubInner {
                config,
                registry,
                runtime,
                state: RwLock::new(Value::Object(Map::new())),
                stores: RwLock::new(BTreeMap::new()),
                paths: PathCache::new(),
                listeners: RwLock::new(Vec::new()),
                handlers: RwLock::new(HashMap::new()),
                any_handlers: RwLock::new(Vec::new()),
                subscriptions: SubscriptionManager::new(),
                dirty: AtomicBool::new(false),
                notifications: AtomicU64::new(0),
            }),
        };

        if log_actions {
            hub.on_any(|_, event, args| debug!(event, ?args, "action dispatched"));
        }

        Ok(hub)
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakHub {
        WeakHub {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Compile a string path through the hub's path cache.
    pub fn path(&self, raw: &str) -> Result<StatePath> {
        self.inner.paths.compile(raw)
    }

    // --- State ---

    /// Value at `path`, or `None` if any segment is absent or the path is
    /// empty or malformed.
    pub fn get<P: AsStatePath + ?Sized>(&self, path: &P) -> Option<Value> {
        let path = match path.resolve(&self.inner.paths) {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "read through invalid path");
                return None;
            }
        };
        state::lookup(&self.inner.state.read(), &path).cloned()
    }

    /// Value at `path` decoded as `T`. `None` if absent or of another shape.
    pub fn get_as<T, P>(&self, path: &P) -> Option<T>
    where
        T: DeserializeOwned,
        P: AsStatePath + ?Sized,
    {
        self.get(path)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Write `value` at `path`. Returns whether the state changed.
    pub fn set<P: AsStatePath + ?Sized>(&self, path: &P, value: Value) -> Result<bool> {
        let path = path.resolve(&self.inner.paths)?;
        self.apply(vec![(path, Some(value))])
    }

    /// Write each `(path, value)` pair independently. Returns whether any
    /// write changed the state.
    ///
    /// All paths are validated before anything is written.
    pub fn set_many<I, P>(&self, writes: I) -> Result<bool>
    where
        I: IntoIterator<Item = (P, Value)>,
        P: AsStatePath,
    {
        let writes = writes
            .into_iter()
            .map(|(path, value)| -> Result<(StatePath, Option<Value>)> {
                Ok((path.resolve(&self.inner.paths)?, Some(value)))
            })
            .collect::<Result<Vec<_>>>()?;
        self.apply(writes)
    }

    /// Delete the leaf at `path`. Returns whether it existed.
    pub fn unset<P: AsStatePath + ?Sized>(&self, path: &P) -> Result<bool> {
        let path = path.resolve(&self.inner.paths)?;
        self.apply(vec![(path, None)])
    }

    fn apply(&self, writes: Vec<(StatePath, Option<Value>)>) -> Result<bool> {
        let mut changed = false;
        let mut outcome = Ok(());
        {
            let mut tree = self.inner.state.write();
            for (path, value) in writes {
                match state::write(&mut tree, &path, value) {
                    Ok(c) => changed |= c,
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }
        }

        // Earlier writes in a batch stay applied, so they still notify.
        if changed {
            self.schedule_notify();
        }
        outcome.map(|()| changed)
    }

    // --- Notification ---

    /// Schedule a change notification without touching the state.
    ///
    /// For sub-stores that mutate their own structures and still need the
    /// UI to refresh.
    pub fn notify(&self) {
        self.schedule_notify();
    }

    /// Call `callback` once per coalesced change notification.
    pub fn register<F>(&self, callback: F)
    where
        F: Fn(&Hub) + Send + Sync + 'static,
    {
        self.inner.listeners.write().push(Arc::new(callback));
    }

    /// Number of change notifications fired so far.
    pub fn notification_count(&self) -> u64 {
        self.inner.notifications.load(Ordering::Acquire)
    }

    fn schedule_notify(&self) {
        if self.inner.dirty.swap(true, Ordering::AcqRel) {
            return;
        }
        let weak = self.downgrade();
        self.spawn(async move {
            if let Some(hub) = weak.upgrade() {
                hub.emit_changed();
            }
        });
    }

    fn emit_changed(&self) {
        // Cleared first so listener-driven changes get their own turn.
        self.inner.dirty.store(false, Ordering::Release);
        let sequence = self.inner.notifications.fetch_add(1, Ordering::AcqRel) + 1;

        let listeners = self.inner.listeners.read().clone();
        for listener in &listeners {
            listener(self);
        }
        self.inner.subscriptions.broadcast_changed(sequence);
    }

    // --- Actions ---

    /// Handle the action `event`. Every handler registered for a name runs.
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&Hub, &[Value]) + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Observe every dispatched action, after its own handlers have run.
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&Hub, &str, &[Value]) + Send + Sync + 'static,
    {
        self.inner.any_handlers.write().push(Arc::new(handler));
    }

    /// Invoke the handlers for `event`, then the wildcard handlers.
    ///
    /// An event nobody handles is dropped.
    pub fn dispatch(&self, event: &str, args: &[Value]) {
        let handlers = self
            .inner
            .handlers
            .read()
            .get(event)
            .cloned()
            .unwrap_or_default();
        if handlers.is_empty() {
            debug!(event, "no handler for action");
        }
        for handler in &handlers {
            handler(self, args);
        }

        let any_handlers = self.inner.any_handlers.read().clone();
        for handler in &any_handlers {
            handler(self, event, args);
        }

        self.inner.subscriptions.broadcast_action(event, args);
    }

    /// Run `task` on the hub's runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.runtime.spawn(task);
    }

    // --- Sub-stores ---

    /// The live sub-store registered under `name`.
    pub fn get_store(&self, name: &str) -> Option<SharedStore> {
        self.inner.stores.read().get(name).cloned()
    }

    /// Run `f` against the live sub-store `name` as its concrete type.
    ///
    /// `None` if no such store is live or it is not an `S`.
    pub fn with_store<S, R>(&self, name: &str, f: impl FnOnce(&mut S) -> R) -> Option<R>
    where
        S: SubStore,
    {
        let store = self.get_store(name)?;
        let mut guard = store.lock();
        match guard.as_any_mut().downcast_mut::<S>() {
            Some(store) => Some(f(store)),
            None => {
                warn!(store = name, "store is not of the requested type");
                None
            }
        }
    }

    /// Build `name` from the registry unless an instance is already live.
    pub fn ensure_store(&self, name: &str) -> Result<()> {
        if self.inner.stores.read().contains_key(name) {
            return Ok(());
        }
        let store = self.inner.registry.build(name, self)?;
        debug!(store = name, "store created");
        self.inner
            .stores
            .write()
            .entry(name.to_string())
            .or_insert(store);
        Ok(())
    }

    /// Names of live sub-stores, sorted.
    pub fn store_names(&self) -> Vec<String> {
        self.inner.stores.read().keys().cloned().collect()
    }

    // --- Snapshots ---

    /// Replace the state tree and rebuild each dumped sub-store.
    ///
    /// Every store is built and restored before anything is committed, so a
    /// failure leaves the hub untouched. Live stores absent from the dump
    /// are kept.
    pub fn inflate(&self, snapshot: Snapshot) -> Result<()> {
        let state = match snapshot.state {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(HubError::InvalidArgument(format!(
                    "snapshot state must be an object, got {other}"
                )))
            }
        };

        let mut built = Vec::with_capacity(snapshot.stores.len());
        for (name, dump) in snapshot.stores {
            let store = self.inner.registry.build(&name, self)?;
            store.lock().restore(dump)?;
            built.push((name, store));
        }

        *self.inner.state.write() = state;
        {
            let mut stores = self.inner.stores.write();
            for (name, store) in built {
                stores.insert(name, store);
            }
        }

        self.schedule_notify();
        Ok(())
    }

    /// Serialize the state tree and every live sub-store.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let state = self.inner.state.read().clone();
        let live: Vec<(String, SharedStore)> = self
            .inner
            .stores
            .read()
            .iter()
            .map(|(name, store)| (name.clone(), Arc::clone(store)))
            .collect();

        let mut stores = BTreeMap::new();
        for (name, store) in live {
            let dump = store.lock().dump().map_err(|e| {
                error!(store = %name, error = %e, "store dump failed");
                e
            })?;
            stores.insert(name, dump);
        }

        Ok(Snapshot { state, stores })
    }

    // --- Subscriptions ---

    /// Receive hub events over a bounded channel.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.inner.subscriptions.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.subscriptions.unsubscribe(id);
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.subscription_count()
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("stores", &self.store_names())
            .field("notifications", &self.notification_count())
            .finish()
    }
}
