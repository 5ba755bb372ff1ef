//! Core types shared across the hub, its stores and the action layer.

use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Serialized form of a hub: the state tree plus one dump per live sub-store.
///
/// This is the only representation that crosses a process boundary. Any
/// snapshot produced by [`crate::Hub::snapshot`] is valid input to
/// [`crate::Hub::inflate`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The state tree as a nested plain mapping.
    #[serde(default)]
    pub state: Value,

    /// Store name to store-specific dump.
    #[serde(default)]
    pub stores: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Encode as JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| HubError::Deserialization(e.to_string()))
    }

    /// Encode as compact MessagePack (field names preserved).
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode from MessagePack produced by [`Snapshot::to_msgpack`].
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Paging descriptor stored at `paging` for the most recent fetch.
///
/// `next == None` marks the end of the result set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One page of search results as returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<Value>>,
}

impl SearchPage {
    /// Result rows, treating a missing or null list as empty.
    pub fn rows(&self) -> &[Value] {
        self.results.as_deref().unwrap_or(&[])
    }
}

/// A parsed location, stored verbatim at `url` by the `route` action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlDescriptor {
    pub full: String,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub fragment: Option<String>,
}

impl UrlDescriptor {
    /// Parse an absolute URL. Repeated query keys keep the last value.
    pub fn parse(full: &str) -> Result<Self> {
        let parsed = Url::parse(full)
            .map_err(|e| HubError::InvalidArgument(format!("bad url {full:?}: {e}")))?;

        let query = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            full: full.to_string(),
            path: parsed.path().to_string(),
            query,
            fragment: parsed.fragment().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_msgpack_keeps_structure() {
        let snapshot = Snapshot {
            state: json!({"paging": {"total": 3, "next": null}, "items": ["a", "b"]}),
            stores: BTreeMap::from([(
                "items".to_string(),
                json!({"capacity": 2, "entries": [{"key": "a", "value": {"Hash": "a"}}]}),
            )]),
        };

        let bytes = snapshot.to_msgpack().unwrap();
        let decoded = Snapshot::from_msgpack(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_snapshot_missing_stores_defaults_empty() {
        let snapshot = Snapshot::from_json(r#"{"state": {"title": "x"}}"#).unwrap();
        assert!(snapshot.stores.is_empty());
        assert_eq!(snapshot.state["title"], "x");
    }

    #[test]
    fn test_search_page_null_results() {
        let page: SearchPage =
            serde_json::from_value(json!({"Total": 0, "Next": null, "Results": null})).unwrap();
        assert!(page.rows().is_empty());
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_paging_serializes_all_fields() {
        let paging = Paging {
            total: 0,
            last: Some("/api/search?x".into()),
            next: None,
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&paging).unwrap(),
            json!({"total": 0, "last": "/api/search?x", "next": null, "error": null})
        );
    }

    #[test]
    fn test_url_descriptor_parse() {
        let url = UrlDescriptor::parse("http://some.domain/some/path?q=1&x=2#frag").unwrap();
        assert_eq!(url.path, "/some/path");
        assert_eq!(url.query.get("q").map(String::as_str), Some("1"));
        assert_eq!(url.fragment.as_deref(), Some("frag"));
    }

    #[test]
    fn test_url_descriptor_rejects_relative() {
        assert!(matches!(
            UrlDescriptor::parse("/relative/only"),
            Err(HubError::InvalidArgument(_))
        ));
    }
}
