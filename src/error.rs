//! Error types for the state hub.

use thiserror::Error;

/// Main error type for hub and sub-store operations.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Cannot create store: `{0}`")]
    UnknownStore(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    #[error("Path conflicts with existing value: {0:?}")]
    PathConflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("No async runtime available")]
    NoRuntime,

    #[error("Unsupported runtime flavor {0}, the hub needs a current-thread runtime")]
    UnsupportedRuntime(String),
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        HubError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for HubError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        HubError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for HubError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        HubError::Deserialization(e.to_string())
    }
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
