//! The action layer: named event handlers that fetch results and fold them
//! into hub state.
//!
//! Four actions make up the UI's whole event surface:
//!
//! | event              | argument        | effect                              |
//! |--------------------|-----------------|-------------------------------------|
//! | `route`            | url descriptor  | stored verbatim at `url`            |
//! | `search`           | url string      | reset results, fetch the first page |
//! | `next`             | none            | fetch and append `paging.next`      |
//! | `toggle:selection` | item id         | flip the id in the selection store  |
//!
//! Fetch failures never escape a handler; they land in `paging.error`.

mod results;

pub use results::Pager;

use crate::error::Result;
use crate::hub::Hub;
use crate::stores::{SelectionStore, ITEMS_STORE, SELECTION_STORE};
use crate::transport::Transport;
use crate::types::UrlDescriptor;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

pub const ROUTE: &str = "route";
pub const SEARCH: &str = "search";
pub const NEXT: &str = "next";
pub const TOGGLE_SELECTION: &str = "toggle:selection";

/// Typed form of the application actions.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Route(UrlDescriptor),
    Search(String),
    Next,
    ToggleSelection(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Route(_) => ROUTE,
            Action::Search(_) => SEARCH,
            Action::Next => NEXT,
            Action::ToggleSelection(_) => TOGGLE_SELECTION,
        }
    }

    pub fn args(&self) -> Result<Vec<Value>> {
        Ok(match self {
            Action::Route(url) => vec![serde_json::to_value(url)?],
            Action::Search(url) => vec![Value::from(url.as_str())],
            Action::Next => Vec::new(),
            Action::ToggleSelection(id) => vec![Value::from(id.as_str())],
        })
    }

    /// Dispatch this action through `hub`.
    pub fn dispatch(&self, hub: &Hub) -> Result<()> {
        hub.dispatch(self.name(), &self.args()?);
        Ok(())
    }
}

/// Register the action handlers on `hub`.
///
/// Makes sure the item and selection stores are live, since the handlers
/// need both. Returns the pager that tracks in-flight fetches.
pub fn install(hub: &Hub, transport: Arc<dyn Transport>) -> Result<Arc<Pager>> {
    hub.ensure_store(ITEMS_STORE)?;
    hub.ensure_store(SELECTION_STORE)?;

    let pager = Pager::new(transport);

    hub.on(ROUTE, route);

    let search_pager = Arc::clone(&pager);
    hub.on(SEARCH, move |hub, args| {
        match args.first().and_then(Value::as_str) {
            Some(url) => search_pager.search(hub, url.to_string()),
            None => warn!("`search` dispatched without a url"),
        }
    });

    let next_pager = Arc::clone(&pager);
    hub.on(NEXT, move |hub, _| next_pager.next(hub));

    hub.on(TOGGLE_SELECTION, toggle_selection);

    Ok(pager)
}

fn route(hub: &Hub, args: &[Value]) {
    let result = match args.first() {
        Some(url) => hub.set("url", url.clone()),
        None => hub.unset("url"),
    };
    if let Err(e) = result {
        error!(error = %e, "route failed");
    }
}

fn toggle_selection(hub: &Hub, args: &[Value]) {
    let Some(id) = args.first().and_then(Value::as_str) else {
        warn!("`toggle:selection` dispatched without an id");
        return;
    };
    if hub
        .with_store::<SelectionStore, _>(SELECTION_STORE, |selection| selection.toggle_item(id))
        .is_none()
    {
        error!("selection store is not available");
    }
}
