//! The HTTP boundary: a pluggable request function plus URL construction.
//!
//! The action layer only ever sees [`Transport`]. [`HttpTransport`] is the
//! `reqwest`-backed implementation; tests substitute their own.

mod http;
mod urls;

pub use http::HttpTransport;
pub use urls::ApiUrls;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Request method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A completed request.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// True iff `status` is in `[200, 300)`.
    pub ok: bool,
    pub status: u16,
    /// Decoded JSON body; `None` for an empty body.
    pub data: Option<Value>,
}

impl Response {
    pub fn new(status: u16, data: Option<Value>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            data,
        }
    }

    /// Reject non-2xx responses.
    pub fn into_ok(self) -> Result<Self, FetchError> {
        if self.ok {
            Ok(self)
        } else {
            Err(FetchError::Status(self.status))
        }
    }
}

/// A failed fetch. The display text is what ends up in `paging.error`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{0}")]
    Network(String),

    #[error("Bad Status Code: {0}")]
    Status(u16),

    #[error("Empty response body")]
    EmptyBody,

    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Issues requests on behalf of the action layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<Response, FetchError>;
}

/// GET `url`, failing on a non-2xx status.
pub async fn get(transport: &dyn Transport, url: &str) -> Result<Response, FetchError> {
    transport.request(Method::Get, url, None).await?.into_ok()
}

/// POST `body` to `url`, failing on a non-2xx status.
pub async fn post(
    transport: &dyn Transport,
    url: &str,
    body: Value,
) -> Result<Response, FetchError> {
    transport
        .request(Method::Post, url, Some(body))
        .await?
        .into_ok()
}

/// PUT `body` to `url`, failing on a non-2xx status.
pub async fn put(
    transport: &dyn Transport,
    url: &str,
    body: Value,
) -> Result<Response, FetchError> {
    transport
        .request(Method::Put, url, Some(body))
        .await?
        .into_ok()
}

/// DELETE `url`, failing on a non-2xx status.
pub async fn delete(transport: &dyn Transport, url: &str) -> Result<Response, FetchError> {
    transport.request(Method::Delete, url, None).await?.into_ok()
}
