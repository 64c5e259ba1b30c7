//! Error types for the storage layer.

use std::path::PathBuf;

use warden_protocol::ProtocolError;

/// Errors that can occur while reading or writing a persisted session.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored blob is not a valid session document.
    #[error("stored session is corrupt: {0}")]
    Corrupt(#[source] ProtocolError),

    /// The session could not be serialized.
    #[error("session could not be encoded: {0}")]
    Encode(#[source] ProtocolError),
}
