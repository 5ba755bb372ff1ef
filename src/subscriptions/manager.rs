//! Fan-out of hub events to subscriber channels.

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{
    DropReason, HubEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<HubEvent>,
}

impl Subscription {
    /// Deliver `event`, or report why this subscriber has to go.
    fn try_send(&self, event: HubEvent) -> Result<(), DropReason> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DropReason::BufferOverflow),
            Err(TrySendError::Disconnected(_)) => Err(DropReason::Disconnected),
        }
    }

    fn wants_changes(&self) -> bool {
        self.config.filter.include_changes
    }

    fn matches_action(&self, name: &str) -> bool {
        if !self.config.filter.include_actions {
            return false;
        }

        if let Some(ref names) = self.config.filter.actions {
            return names.iter().any(|n| n == name);
        }

        true
    }
}

/// Live subscriptions of one hub.
pub struct SubscriptionManager {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber with its own bounded channel.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Remove a subscriber; it gets a final `Dropped` event if there is room.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            let _ = sub.sender.try_send(HubEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Broadcasting ---

    /// Broadcast a coalesced change notification.
    pub fn broadcast_changed(&self, sequence: u64) {
        self.broadcast(Subscription::wants_changes, HubEvent::Changed { sequence });
    }

    /// Broadcast a dispatched action.
    pub fn broadcast_action(&self, name: &str, args: &[Value]) {
        let event = HubEvent::Action {
            name: name.to_string(),
            args: args.to_vec(),
        };

        self.broadcast(|sub| sub.matches_action(name), event);
    }

    /// Send `event` to every subscriber `wants`; drop those that cannot take it.
    fn broadcast<F>(&self, wants: F, event: HubEvent)
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut stalled = Vec::new();

        {
            let subs = self.subscriptions.read();
            if subs.is_empty() {
                return;
            }
            for (id, sub) in subs.iter() {
                if wants(sub) {
                    if let Err(reason) = sub.try_send(event.clone()) {
                        stalled.push((*id, reason));
                    }
                }
            }
        }

        if !stalled.is_empty() {
            let mut subs = self.subscriptions.write();
            for (id, reason) in stalled {
                if let Some(sub) = subs.remove(&id) {
                    tracing::debug!(subscription = id.0, ?reason, "dropping subscriber");
                    let _ = sub.sender.try_send(HubEvent::Dropped { reason });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::SubscriptionFilter;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_subscribe_unsubscribe() {
        let manager = SubscriptionManager::new();

        let handle = manager.subscribe(SubscriptionConfig::default());
        assert_eq!(manager.subscription_count(), 1);

        manager.unsubscribe(handle.id);
        assert_eq!(manager.subscription_count(), 0);
        assert_eq!(
            handle.try_recv().unwrap(),
            HubEvent::Dropped {
                reason: DropReason::Unsubscribed
            }
        );
    }

    #[test]
    fn test_action_filter_by_name() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig {
            filter: SubscriptionFilter::action_names(vec!["search".to_string()]),
            ..Default::default()
        });

        manager.broadcast_action("next", &[]);
        manager.broadcast_action("search", &[json!("/api/search?x")]);
        manager.broadcast_changed(1);

        let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(
            event,
            HubEvent::Action {
                name: "search".to_string(),
                args: vec![json!("/api/search?x")],
            }
        );
        assert!(handle.try_recv().is_err());
    }

    #[test]
    fn test_changes_only() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig {
            filter: SubscriptionFilter::changes(),
            ..Default::default()
        });

        manager.broadcast_action("route", &[]);
        manager.broadcast_changed(7);

        assert_eq!(handle.try_recv().unwrap(), HubEvent::Changed { sequence: 7 });
        assert!(handle.try_recv().is_err());
    }

    #[test]
    fn test_drop_slow_subscriber() {
        let manager = SubscriptionManager::new();
        let _handle = manager.subscribe(SubscriptionConfig {
            buffer_size: 2,
            filter: SubscriptionFilter::changes(),
        });

        for i in 0..10 {
            manager.broadcast_changed(i);
        }

        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_drop_disconnected_subscriber() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig::default());
        drop(handle);

        manager.broadcast_changed(1);
        assert_eq!(manager.subscription_count(), 0);
    }
}
