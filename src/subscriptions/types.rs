//! Subscription types for channel-based hub observers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-subscription settings.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Events buffered before the subscriber counts as stalled and is
    /// dropped. Default: 1000
    pub buffer_size: usize,

    /// Which events to deliver.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Selects the events a subscriber receives.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Restrict action events to these names (None = all actions).
    pub actions: Option<Vec<String>>,

    /// Include coalesced change notifications.
    pub include_changes: bool,

    /// Include dispatched actions.
    pub include_actions: bool,
}

impl SubscriptionFilter {
    /// Only coalesced change notifications.
    pub fn changes() -> Self {
        Self {
            include_changes: true,
            ..Default::default()
        }
    }

    /// Every dispatched action.
    pub fn actions() -> Self {
        Self {
            include_actions: true,
            ..Default::default()
        }
    }

    /// Only the named actions.
    pub fn action_names(names: Vec<String>) -> Self {
        Self {
            actions: Some(names),
            include_actions: true,
            ..Default::default()
        }
    }

    /// Changes and every action.
    pub fn all() -> Self {
        Self {
            include_changes: true,
            include_actions: true,
            ..Default::default()
        }
    }
}

/// Events delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    /// State changed; one event per coalesced notification.
    Changed {
        /// Running count of notifications fired by this hub.
        sequence: u64,
    },

    /// An action was dispatched.
    Action { name: String, args: Vec<Value> },

    /// Last event of a subscription.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The buffer filled up.
    BufferOverflow,
    /// The handle was dropped.
    Disconnected,
    /// [`crate::Hub::unsubscribe`] was called.
    Unsubscribed,
}

/// Identifies one subscription within its hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiving end of a hub subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub receiver: crossbeam_channel::Receiver<HubEvent>,
}

impl SubscriptionHandle {
    /// Block until the next event.
    pub fn recv(&self) -> Result<HubEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&self) -> Result<HubEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for at most `timeout`.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<HubEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
