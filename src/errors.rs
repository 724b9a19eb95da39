//! Modeled Cache Error Hierarchy
//!
//! Errors are grouped by the layer that raises them: cache lifecycle misuse,
//! payload decoding, store operations, path syntax and configuration.
//! Listener failures are never returned to callers; they are reported through
//! [`ListenerError`].

use bytes::Bytes;
use config::ConfigError;

use crate::CacheState;
use crate::ZPath;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache lifecycle misuse
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Payload could not be decoded into the model type
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Model could not be encoded (write path)
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Coordination store operation failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Malformed node path
    #[error(transparent)]
    Path(#[from] PathError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Operation not permitted in the current lifecycle state
    #[error("Cannot {operation} while cache is {state:?}")]
    IllegalState {
        operation: &'static str,
        state: CacheState,
    },
}

/// Codec failure enriched with the node it was decoding
#[derive(Debug, thiserror::Error)]
#[error("Failed to decode {path} (version {version}, {} bytes): {source}", .bytes.len())]
pub struct DecodeError {
    pub path: ZPath,
    pub version: i32,
    /// The undecodable payload, untouched
    pub bytes: Bytes,
    #[source]
    pub source: CodecError,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode codec error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Codec error: {0}")]
    Custom(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Node does not exist: {0}")]
    NoNode(ZPath),

    #[error("Node already exists: {0}")]
    NodeExists(ZPath),

    #[error("Node has children: {0}")]
    NotEmpty(ZPath),

    #[error("Version mismatch on {path}: expected {expected}, actual {actual}")]
    BadVersion {
        path: ZPath,
        expected: i32,
        actual: i32,
    },

    #[error("Connection to the store is not available")]
    ConnectionLoss,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Path must not be empty")]
    Empty,

    #[error("Path must start with '/': {0}")]
    NotAbsolute(String),

    #[error("Path must not end with '/': {0}")]
    TrailingSeparator(String),

    #[error("Invalid segment {segment:?} in path {path}")]
    InvalidSegment { path: String, segment: String },
}

/// A listener failed while an event was being dispatched to it
#[derive(Debug, Clone, thiserror::Error)]
#[error("Listener {listener_id} failed: {message}")]
pub struct ListenerError {
    pub listener_id: u64,
    pub message: String,
}
