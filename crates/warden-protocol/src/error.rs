//! Error types for the protocol layer.
//!
//! Each crate in Warden defines its own error enum. A `ProtocolError` means
//! the problem is in the shape of the data: a body that isn't JSON, a server
//! that answered with an error document, or a blob that failed to
//! (de)serialize.

use serde_json::Value;

/// Errors that can occur while encoding or decoding session data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into JSON).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning JSON into a Rust type).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The server answered with a non-2xx status and a JSON body.
    ///
    /// The parsed body is kept as-is so callers can surface the server's
    /// own error document (e.g. `{"error": "invalid_grant"}`).
    #[error("server rejected the request: {0}")]
    Rejected(Value),

    /// The response body could not be parsed as JSON.
    ///
    /// Carries the raw text, whatever the status code was.
    #[error("response body is not valid JSON: {0}")]
    Unparsable(String),
}
