//! Channel-based observers of a hub.
//!
//! Callbacks registered with [`crate::Hub::register`] run on the hub's own
//! task. Consumers that live elsewhere (a render thread, a debugger) can
//! instead subscribe and receive:
//! - One `Changed` event per coalesced notification
//! - One `Action` event per dispatch
//!
//! Buffers are bounded; a subscriber that falls behind is dropped.
//!
//! # Example
//!
//! ```ignore
//! let handle = hub.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::changes(),
//!     ..Default::default()
//! });
//!
//! loop {
//!     match handle.recv() {
//!         Ok(HubEvent::Changed { .. }) => redraw(&hub),
//!         Ok(HubEvent::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, HubEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
