//! Search and pagination over the result set.

use crate::hub::{Hub, WeakHub};
use crate::stores::{ItemStore, ITEMS_STORE};
use crate::transport::{self, FetchError, Transport};
use crate::types::{Paging, SearchPage};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Drives the `search` / `next` fetches for one result set.
///
/// Every fetch takes a new request id. Only the response to the latest
/// request is applied; anything older is stale and dropped.
pub struct Pager {
    transport: Arc<dyn Transport>,
    latest: AtomicU64,
}

impl Pager {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            latest: AtomicU64::new(0),
        })
    }

    /// Id of the most recently issued fetch; 0 before the first.
    pub fn latest_request(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, request: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == request
    }

    /// Start a new result set from `url`.
    ///
    /// Clears the item cache and the `items` / `paging` state right away,
    /// then fetches in the background.
    pub fn search(self: &Arc<Self>, hub: &Hub, url: String) {
        reset_results(hub);

        let request = self.begin();
        let pager = Arc::clone(self);
        let weak = hub.downgrade();
        hub.spawn(async move {
            let outcome = pager.fetch(&url).await;
            let Some(hub) = pager.settle(&weak, request, &url) else {
                return;
            };

            match outcome {
                Ok(page) => {
                    let ids = cache_rows(&hub, page.rows());
                    let paging = Paging {
                        total: page.total,
                        last: Some(url),
                        next: page.next,
                        error: None,
                    };
                    commit(&hub, paging, ids);
                }
                Err(err) => record_failure(&hub, &url, &err),
            }
        });
    }

    /// Fetch the page at `paging.next` and append it to `items`.
    ///
    /// Without a next url this only logs a warning.
    pub fn next(self: &Arc<Self>, hub: &Hub) {
        let Some(url) = hub
            .get_as::<String, _>("paging.next")
            .filter(|url| !url.is_empty())
        else {
            warn!("`next` dispatched, but no next url");
            return;
        };

        let request = self.begin();
        let pager = Arc::clone(self);
        let weak = hub.downgrade();
        hub.spawn(async move {
            let outcome = pager.fetch(&url).await;
            let Some(hub) = pager.settle(&weak, request, &url) else {
                return;
            };

            match outcome {
                Ok(page) => {
                    let mut items = match hub.get("items") {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    };
                    items.extend(cache_rows(&hub, page.rows()));
                    let paging = Paging {
                        total: page.total,
                        last: Some(url),
                        next: page.next,
                        error: None,
                    };
                    commit(&hub, paging, items);
                }
                // Items already loaded stay put.
                Err(err) => record_failure(&hub, &url, &err),
            }
        });
    }

    async fn fetch(&self, url: &str) -> Result<SearchPage, FetchError> {
        let response = transport::get(self.transport.as_ref(), url).await?;
        let data = response.data.ok_or(FetchError::EmptyBody)?;
        serde_json::from_value(data).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// The hub to apply `request`'s outcome to, unless the response is stale
    /// or the hub is gone.
    fn settle(&self, hub: &WeakHub, request: u64, url: &str) -> Option<Hub> {
        if !self.is_current(request) {
            debug!(request, latest = self.latest_request(), url, "discarding stale response");
            return None;
        }
        hub.upgrade()
    }
}

fn reset_results(hub: &Hub) {
    let capacity = hub.config().item_capacity;
    let reset = hub.with_store::<ItemStore, _>(ITEMS_STORE, |items| {
        items.reset();
        capacity.map_or(Ok(()), |n| items.set_capacity(n))
    });
    match reset {
        Some(Ok(())) => {}
        // Hub construction rejects a zero capacity, the only value
        // `set_capacity` refuses.
        Some(Err(e)) => {
            debug_assert!(false, "configured capacity rejected: {e}");
            error!(error = %e, "item cache capacity rejected");
        }
        None => error!("items store is not available"),
    }

    if let Err(e) = hub.set_many([("paging", json!({})), ("items", Value::Null)]) {
        error!(error = %e, "failed to clear results");
    }
}

/// Put each row into the item cache; return the row ids in order.
fn cache_rows(hub: &Hub, rows: &[Value]) -> Vec<Value> {
    let keyed: Vec<(String, &Value)> = rows
        .iter()
        .filter_map(|row| match row.get("Hash").and_then(Value::as_str) {
            Some(hash) => Some((hash.to_string(), row)),
            None => {
                warn!("result row without a Hash, skipping");
                None
            }
        })
        .collect();

    let cached = hub.with_store::<ItemStore, _>(ITEMS_STORE, |items| {
        for (hash, row) in &keyed {
            items.put(hash.clone(), (*row).clone());
        }
    });
    if cached.is_none() {
        error!("items store is not available, results are not cached");
    }

    keyed.into_iter().map(|(hash, _)| Value::from(hash)).collect()
}

fn commit(hub: &Hub, paging: Paging, items: Vec<Value>) {
    let paging = match serde_json::to_value(paging) {
        Ok(paging) => paging,
        Err(e) => {
            error!(error = %e, "failed to encode paging");
            return;
        }
    };
    if let Err(e) = hub.set_many([("paging", paging), ("items", Value::Array(items))]) {
        error!(error = %e, "failed to store results");
    }
}

fn record_failure(hub: &Hub, url: &str, err: &FetchError) {
    error!(url, error = %err, "fetch failed");
    if let Err(e) = hub.set("paging.error", Value::from(err.to_string())) {
        error!(error = %e, "failed to record fetch error");
    }
}
