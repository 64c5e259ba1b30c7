//! Error types for the session layer.

use serde_json::Value;

/// Why an authenticator operation failed.
///
/// This is the rejection payload of [`Authenticator`](crate::Authenticator)
/// calls, and what ends up in [`AuthState::last_error`](crate::AuthState)
/// after a failed login, so it is `Clone` and holds no live resources.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The token endpoint answered 2xx but without a usable access token.
    #[error("access_token is missing in server response")]
    MissingAccessToken,

    /// The server rejected the request; carries its parsed JSON error body
    /// (e.g. `{"error": "invalid_grant"}`).
    #[error("server rejected the request: {0}")]
    Rejected(Value),

    /// The server's response body was not JSON; carries the raw text.
    #[error("unparsable server response: {0}")]
    UnparsableResponse(String),

    /// No response arrived at all.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A token refresh failed. Deliberately carries no detail; the
    /// failure is logged where it happens.
    #[error("access token could not be refreshed")]
    RefreshFailed,

    /// The supplied data cannot be turned back into a session.
    #[error("session cannot be restored: {0}")]
    NotRestorable(String),

    /// The authenticator does not implement this operation.
    #[error("authenticator does not support {0}")]
    Unsupported(&'static str),
}
