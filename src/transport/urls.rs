//! API URL construction.

use crate::error::{HubError, Result};
use serde_json::{json, Value};
use url::Url;

const MEDIA_TYPES: [&str; 2] = ["Video", "Photo"];
const TAG_TYPES: [&str; 1] = ["Tag"];

/// Builds API URLs under a fixed base by pushing path segments.
///
/// Ids go in as single percent-encoded segments, so an id can never climb
/// out of its resource path.
#[derive(Clone, Debug)]
pub struct ApiUrls {
    base: Url,
}

impl ApiUrls {
    /// `base` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| HubError::InvalidArgument(format!("bad api base {base:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(HubError::InvalidArgument(format!(
                "api base {base} cannot hold a path"
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The base with `segments` appended.
    pub fn url<I, S>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Search URL carrying the JSON-encoded `query` as the `query` parameter.
    pub fn search(&self, query: &Value) -> Url {
        let mut url = self.url(["search"]);
        url.query_pairs_mut()
            .append_pair("query", &query.to_string());
        url
    }

    pub fn item(&self, id: &str) -> Result<Url> {
        Ok(self.url(["items", check_id(id)?]))
    }

    pub fn thumb_small(&self, id: &str) -> Result<Url> {
        Ok(self.url(["items", check_id(id)?, "thumb", "small"]))
    }

    pub fn thumb_large(&self, id: &str) -> Result<Url> {
        Ok(self.url(["items", check_id(id)?, "thumb", "large"]))
    }

    pub fn raw(&self, id: &str) -> Result<Url> {
        Ok(self.url(["items", check_id(id)?, "raw"]))
    }

    /// All tags, newest first.
    pub fn tags(&self) -> Url {
        self.search(&json!({
            "Types": TAG_TYPES,
            "Sort": {"Created": "desc"}
        }))
    }

    /// The tag with the given slug.
    pub fn tag(&self, slug: &str) -> Url {
        self.search(&json!({
            "Types": TAG_TYPES,
            "Match": {"Meta.Slug": slug}
        }))
    }

    /// Recent photos and videos, newest first.
    pub fn recent(&self) -> Url {
        self.search(&json!({
            "Types": MEDIA_TYPES,
            "Sort": {"Created": "desc"}
        }))
    }
}

fn check_id(id: &str) -> Result<&str> {
    match id {
        "" | "." | ".." => Err(HubError::InvalidArgument(format!(
            "{id:?} is not a valid item id"
        ))),
        _ => Ok(id),
    }
}
