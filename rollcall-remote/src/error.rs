//! Error types for the remote store adapter

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("remote returned status {0}")]
    Status(u16),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid remote key: {0}")]
    InvalidKey(String),

    #[error("remote unavailable")]
    Unavailable,
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Serialization(err.to_string())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
