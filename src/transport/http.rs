//! `reqwest`-backed transport.

use super::{ApiUrls, FetchError, Method, Response, Transport};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Transport over HTTP.
///
/// Request URLs are resolved against `base`, so the server's own relative
/// links (a `Next` of `/api/search?...&from=20`) can be fetched as given.
/// Absolute URLs pass through unchanged.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    /// A transport rooted at the same base as `urls`.
    pub fn for_api(urls: &ApiUrls) -> Self {
        Self::new(urls.base().clone())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        self.base
            .join(url)
            .map_err(|e| FetchError::Network(format!("bad url {url:?}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<Response, FetchError> {
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let url = self.resolve(url)?;
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let mut response = Response::new(status, None);
        // An empty body is fine, e.g. a 201 or 204. Error pages are often
        // not JSON; their status is what gets reported.
        if !text.is_empty() {
            match serde_json::from_str(&text) {
                Ok(data) => response.data = Some(data),
                Err(e) if response.ok => return Err(FetchError::Decode(e.to_string())),
                Err(_) => {}
            }
        }

        Ok(response)
    }
}
