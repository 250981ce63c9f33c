//! Error types for keyscope

use std::io;
use thiserror::Error;

/// Keyscope error type
#[derive(Error, Debug)]
pub enum KeyscopeError {
    /// The store cannot be reached, or the key stream broke mid-scan.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The key disappeared between listing and querying.
    #[error("Key not found: {0}")]
    KeyMissing(String),

    /// The store answered, but not with what we asked for.
    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl KeyscopeError {
    /// Connectivity-class failures abort a scan; everything else is absorbed per key.
    pub fn is_connection(&self) -> bool {
        matches!(self, KeyscopeError::Connection(_))
    }
}

impl From<redis::RedisError> for KeyscopeError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            KeyscopeError::Connection(err.to_string())
        } else {
            KeyscopeError::Store(err.to_string())
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, KeyscopeError>;
