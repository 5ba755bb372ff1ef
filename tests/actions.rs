//! Search, pagination and selection scenarios driven through dispatch.

use async_trait::async_trait;
use gallery_state::{
    actions, Action, FetchError, Hub, HubConfig, HubError, ItemStore, Method, Response,
    SelectionStore, StoreRegistry, Transport, UrlDescriptor, ITEMS_STORE, SELECTION_STORE,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Transport answering from a script, optionally holding a url until released.
#[derive(Default)]
struct ScriptedTransport {
    responses: Mutex<HashMap<String, Result<Response, FetchError>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn page(&self, url: &str, page: Value) {
        self.responses
            .lock()
            .insert(url.to_string(), Ok(Response::new(200, Some(page))));
    }

    fn reply(&self, url: &str, response: Result<Response, FetchError>) {
        self.responses.lock().insert(url.to_string(), response);
    }

    fn hold(&self, url: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(url.to_string(), rx);
        tx
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(
        &self,
        _method: Method,
        url: &str,
        _body: Option<Value>,
    ) -> Result<Response, FetchError> {
        self.calls.lock().push(url.to_string());
        let gate = self.gates.lock().remove(url);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let response = self.responses.lock().get(url).cloned();
        response.unwrap_or_else(|| Ok(Response::new(404, None)))
    }
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn setup_with(config: HubConfig) -> (Hub, Arc<ScriptedTransport>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let hub = Hub::new(config, StoreRegistry::with_defaults()).unwrap();
    let transport = Arc::new(ScriptedTransport::default());
    actions::install(&hub, transport.clone()).unwrap();
    (hub, transport)
}

fn setup() -> (Hub, Arc<ScriptedTransport>) {
    setup_with(HubConfig::default())
}

fn rows(hashes: &[&str]) -> Value {
    Value::Array(
        hashes
            .iter()
            .map(|h| json!({"Hash": h, "Type": "Photo"}))
            .collect(),
    )
}

async fn load_first_page(hub: &Hub, transport: &ScriptedTransport) {
    transport.page(
        "/api/search?q",
        json!({"Total": 3, "Next": "/p2", "Results": rows(&["a", "b"])}),
    );
    hub.dispatch(actions::SEARCH, &[json!("/api/search?q")]);
    settle().await;
}

fn cached(hub: &Hub, id: &str) -> bool {
    hub.with_store::<ItemStore, _>(ITEMS_STORE, |items| items.contains(id))
        .unwrap()
}

// --- Search ---

#[tokio::test]
async fn test_empty_search() {
    let (hub, transport) = setup();
    transport.page(
        "/api/search?x",
        json!({"Total": 0, "Next": null, "Results": []}),
    );

    hub.dispatch("search", &[json!("/api/search?x")]);
    settle().await;

    assert_eq!(hub.get("items"), Some(json!([])));
    assert_eq!(
        hub.get("paging"),
        Some(json!({"total": 0, "last": "/api/search?x", "next": null, "error": null}))
    );
}

#[tokio::test]
async fn test_search_caches_results() {
    let (hub, transport) = setup();
    load_first_page(&hub, &transport).await;

    assert_eq!(hub.get("items"), Some(json!(["a", "b"])));
    assert!(cached(&hub, "a"));
    assert_eq!(
        hub.with_store::<ItemStore, _>(ITEMS_STORE, |items| items.peek("b").cloned())
            .flatten(),
        Some(json!({"Hash": "b", "Type": "Photo"}))
    );
}

#[tokio::test]
async fn test_search_clears_state_before_fetching() {
    let (hub, transport) = setup();
    load_first_page(&hub, &transport).await;

    let release = transport.hold("/api/search?other");
    transport.page(
        "/api/search?other",
        json!({"Total": 1, "Next": null, "Results": rows(&["z"])}),
    );
    hub.dispatch(actions::SEARCH, &[json!("/api/search?other")]);

    // Cleared synchronously, while the fetch is still pending.
    assert_eq!(hub.get("items"), Some(Value::Null));
    assert_eq!(hub.get("paging"), Some(json!({})));
    assert!(!cached(&hub, "a"));

    release.send(()).unwrap();
    settle().await;
    assert_eq!(hub.get("items"), Some(json!(["z"])));
}

#[tokio::test]
async fn test_failed_search_sets_error_only() {
    let (hub, transport) = setup();
    transport.reply("/api/search?bad", Ok(Response::new(500, None)));

    hub.dispatch(actions::SEARCH, &[json!("/api/search?bad")]);
    settle().await;

    assert_eq!(
        hub.get("paging"),
        Some(json!({"error": "Bad Status Code: 500"}))
    );
    assert_eq!(hub.get("items"), Some(Value::Null));
}

#[tokio::test]
async fn test_empty_body_is_an_error() {
    let (hub, transport) = setup();
    transport.reply("/api/search?empty", Ok(Response::new(204, None)));

    hub.dispatch(actions::SEARCH, &[json!("/api/search?empty")]);
    settle().await;

    assert_eq!(
        hub.get_as::<String, _>("paging.error").as_deref(),
        Some("Empty response body")
    );
}

#[tokio::test]
async fn test_rows_without_hash_are_skipped() {
    let (hub, transport) = setup();
    transport.page(
        "/s",
        json!({"Total": 2, "Next": null, "Results": [{"Hash": "a"}, {"Name": "orphan"}]}),
    );

    hub.dispatch(actions::SEARCH, &[json!("/s")]);
    settle().await;

    assert_eq!(hub.get("items"), Some(json!(["a"])));
}

#[tokio::test]
async fn test_stale_search_response_is_discarded() {
    let (hub, transport) = setup();
    let release_slow = transport.hold("/slow");
    transport.page(
        "/slow",
        json!({"Total": 1, "Next": "/slow2", "Results": rows(&["old"])}),
    );
    transport.page(
        "/fast",
        json!({"Total": 1, "Next": null, "Results": rows(&["new"])}),
    );

    hub.dispatch(actions::SEARCH, &[json!("/slow")]);
    settle().await;
    hub.dispatch(actions::SEARCH, &[json!("/fast")]);
    settle().await;
    assert_eq!(hub.get("items"), Some(json!(["new"])));

    release_slow.send(()).unwrap();
    settle().await;

    assert_eq!(hub.get("items"), Some(json!(["new"])));
    assert_eq!(hub.get("paging.last"), Some(json!("/fast")));
    assert!(!cached(&hub, "old"));
}

#[tokio::test]
async fn test_search_reapplies_configured_capacity() {
    let (hub, transport) = setup_with(HubConfig {
        item_capacity: Some(2),
        ..Default::default()
    });
    transport.page(
        "/s",
        json!({"Total": 3, "Next": null, "Results": rows(&["a", "b", "c"])}),
    );

    hub.dispatch(actions::SEARCH, &[json!("/s")]);
    settle().await;

    assert_eq!(hub.get("items"), Some(json!(["a", "b", "c"])));
    assert_eq!(
        hub.with_store::<ItemStore, _>(ITEMS_STORE, |items| (items.capacity(), items.len())),
        Some((Some(2), 2))
    );
    assert!(!cached(&hub, "a"));
}

#[tokio::test]
async fn test_zero_capacity_never_reaches_search() {
    let result = Hub::new(
        HubConfig {
            item_capacity: Some(0),
            ..Default::default()
        },
        StoreRegistry::with_defaults(),
    );
    assert!(matches!(result, Err(HubError::InvalidArgument(_))));

    // The smallest accepted capacity still survives repeated resets.
    let (hub, transport) = setup_with(HubConfig {
        item_capacity: Some(1),
        ..Default::default()
    });
    for _ in 0..2 {
        transport.page(
            "/s",
            json!({"Total": 2, "Next": null, "Results": rows(&["a", "b"])}),
        );
        hub.dispatch(actions::SEARCH, &[json!("/s")]);
        settle().await;
    }

    assert_eq!(hub.get("items"), Some(json!(["a", "b"])));
    assert_eq!(
        hub.with_store::<ItemStore, _>(ITEMS_STORE, |items| (items.capacity(), items.len())),
        Some((Some(1), 1))
    );
    assert!(cached(&hub, "b"));
}

// --- Pagination ---

#[tokio::test]
async fn test_next_appends_page() {
    let (hub, transport) = setup();
    load_first_page(&hub, &transport).await;
    transport.page("/p2", json!({"Total": 3, "Next": null, "Results": rows(&["c"])}));

    hub.dispatch("next", &[]);
    settle().await;

    assert_eq!(hub.get("items"), Some(json!(["a", "b", "c"])));
    assert_eq!(hub.get("paging.next"), Some(Value::Null));
    assert_eq!(hub.get("paging.last"), Some(json!("/p2")));
    assert!(cached(&hub, "c"));
}

#[tokio::test]
async fn test_failed_next_keeps_items() {
    let (hub, transport) = setup();
    load_first_page(&hub, &transport).await;
    transport.reply("/p2", Err(FetchError::Network("timeout".to_string())));

    hub.dispatch(actions::NEXT, &[]);
    settle().await;

    assert_eq!(hub.get("paging.error"), Some(json!("timeout")));
    assert_eq!(hub.get("items"), Some(json!(["a", "b"])));
    assert_eq!(hub.get("paging.next"), Some(json!("/p2")));
    assert_eq!(hub.get("paging.total"), Some(json!(3)));
}

#[tokio::test]
async fn test_next_success_clears_previous_error() {
    let (hub, transport) = setup();
    load_first_page(&hub, &transport).await;

    transport.reply("/p2", Err(FetchError::Network("timeout".to_string())));
    hub.dispatch(actions::NEXT, &[]);
    settle().await;
    assert_eq!(hub.get("paging.error"), Some(json!("timeout")));

    transport.page("/p2", json!({"Total": 3, "Next": null, "Results": rows(&["c"])}));
    hub.dispatch(actions::NEXT, &[]);
    settle().await;

    assert_eq!(hub.get("paging.error"), Some(Value::Null));
    assert_eq!(hub.get("items"), Some(json!(["a", "b", "c"])));
}

#[tokio::test]
async fn test_next_without_next_url_is_noop() {
    let (hub, transport) = setup();
    transport.page("/s", json!({"Total": 1, "Next": null, "Results": rows(&["a"])}));
    hub.dispatch(actions::SEARCH, &[json!("/s")]);
    settle().await;
    let before = hub.snapshot().unwrap();

    hub.dispatch(actions::NEXT, &[]);
    settle().await;

    assert_eq!(transport.calls(), vec!["/s"]);
    assert_eq!(hub.snapshot().unwrap(), before);
}

#[tokio::test]
async fn test_search_supersedes_pending_next() {
    let (hub, transport) = setup();
    load_first_page(&hub, &transport).await;

    let release = transport.hold("/p2");
    transport.page("/p2", json!({"Total": 3, "Next": null, "Results": rows(&["c"])}));
    hub.dispatch(actions::NEXT, &[]);
    settle().await;

    transport.page("/new", json!({"Total": 1, "Next": null, "Results": rows(&["n"])}));
    hub.dispatch(actions::SEARCH, &[json!("/new")]);
    settle().await;

    release.send(()).unwrap();
    settle().await;
    assert_eq!(hub.get("items"), Some(json!(["n"])));
}

// --- Selection and routing ---

#[tokio::test]
async fn test_toggle_selection() {
    let (hub, transport) = setup();
    load_first_page(&hub, &transport).await;

    hub.dispatch(actions::TOGGLE_SELECTION, &[json!("b")]);
    hub.dispatch(actions::TOGGLE_SELECTION, &[json!("a")]);
    hub.dispatch(actions::TOGGLE_SELECTION, &[json!("unknown")]);

    let selected =
        hub.with_store::<SelectionStore, _>(SELECTION_STORE, |s| s.selected());
    assert_eq!(selected, Some(vec!["b".to_string(), "a".to_string()]));

    Action::ToggleSelection("b".into()).dispatch(&hub).unwrap();
    let selected =
        hub.with_store::<SelectionStore, _>(SELECTION_STORE, |s| s.selected());
    assert_eq!(selected, Some(vec!["a".to_string()]));
}

#[tokio::test]
async fn test_route_stores_descriptor() {
    let (hub, _transport) = setup();
    let url = UrlDescriptor::parse("http://some.domain/tags/holiday?page=2#top").unwrap();

    Action::Route(url.clone()).dispatch(&hub).unwrap();

    assert_eq!(hub.get_as::<UrlDescriptor, _>("url"), Some(url));
    assert_eq!(hub.get("url.query.page"), Some(json!("2")));
}

#[tokio::test]
async fn test_unhandled_action_is_dropped() {
    let (hub, transport) = setup();
    hub.dispatch("slideshow:open", &[json!(3)]);
    settle().await;
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_one_notification_per_commit() {
    let (hub, transport) = setup();
    let count = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&count);
    hub.register(move |_| *seen.lock() += 1);

    let release = transport.hold("/s");
    transport.page("/s", json!({"Total": 1, "Next": null, "Results": rows(&["a"])}));
    hub.dispatch(actions::SEARCH, &[json!("/s")]);
    settle().await;
    assert_eq!(*count.lock(), 1);

    release.send(()).unwrap();
    settle().await;
    assert_eq!(*count.lock(), 2);
}
