//! The current selection, cross-referenced against the item cache.

use crate::error::{HubError, Result};
use crate::hub::{Hub, WeakHub};
use crate::stores::{ItemStore, SubStore, ITEMS_STORE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SelectionDump {
    #[serde(default, alias = "data")]
    entries: Map<String, Value>,
    /// Insertion order. Older dumps carry only `entries`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order: Option<Vec<String>>,
}

/// Ordered set of selected item ids plus a snapshot of each item.
///
/// The snapshot is taken from the item cache when the id is added and is not
/// re-resolved afterwards.
pub struct SelectionStore {
    hub: WeakHub,
    order: Vec<String>,
    items: HashMap<String, Value>,
}

impl SelectionStore {
    pub fn new(hub: &Hub) -> Self {
        Self {
            hub: hub.downgrade(),
            order: Vec::new(),
            items: HashMap::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Add `id` if it is not selected and the item cache can resolve it.
    ///
    /// Returns whether the selection changed.
    pub fn add_item(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        let Some(hub) = self.hub.upgrade() else {
            return false;
        };
        let Some(item) = hub
            .with_store::<ItemStore, _>(ITEMS_STORE, |items| items.get(id).cloned())
            .flatten()
        else {
            return false;
        };

        self.order.push(id.to_string());
        self.items.insert(id.to_string(), item);
        hub.notify();
        true
    }

    /// Remove `id` if selected. Returns whether the selection changed.
    pub fn remove_item(&mut self, id: &str) -> bool {
        if self.items.remove(id).is_none() {
            return false;
        }
        self.order.retain(|selected| selected != id);
        if let Some(hub) = self.hub.upgrade() {
            hub.notify();
        }
        true
    }

    /// Flip membership of `id`. Returns whether `id` is selected afterwards.
    pub fn toggle_item(&mut self, id: &str) -> bool {
        if self.contains(id) {
            self.remove_item(id);
            false
        } else {
            self.add_item(id)
        }
    }

    pub fn get_item(&self, id: &str) -> Option<&Value> {
        self.items.get(id)
    }

    /// Selected ids in insertion order.
    pub fn selected(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn reset(&mut self) {
        self.order.clear();
        self.items.clear();
    }
}

impl SubStore for SelectionStore {
    fn dump(&self) -> Result<Value> {
        let entries = self
            .order
            .iter()
            .filter_map(|id| self.items.get(id).map(|item| (id.clone(), item.clone())))
            .collect();
        let dump = SelectionDump {
            entries,
            order: Some(self.order.clone()),
        };
        Ok(serde_json::to_value(dump)?)
    }

    fn restore(&mut self, dump: Value) -> Result<()> {
        let dump: SelectionDump = serde_json::from_value(dump)
            .map_err(|e| HubError::Deserialization(format!("selection dump: {e}")))?;

        self.reset();
        let mut seen = HashSet::new();
        let order: Vec<String> = dump
            .order
            .unwrap_or_default()
            .into_iter()
            .chain(dump.entries.keys().cloned())
            .filter(|id| dump.entries.contains_key(id) && seen.insert(id.clone()))
            .collect();

        self.items = dump.entries.into_iter().collect();
        self.order = order;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
