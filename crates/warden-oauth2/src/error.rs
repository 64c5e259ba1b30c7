//! Error types for building OAuth2 authenticators.

/// Setup mistakes, reported by builders before anything talks to a server.
///
/// Runtime failures (bad credentials, refused refresh) are
/// [`SessionError`](warden_session::SessionError)s instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuth2Error {
    /// The builder was finished without an HTTP client.
    #[error("an HTTP client is required")]
    MissingHttpClient,

    /// The authenticator name is empty.
    #[error("authenticator name must not be empty")]
    EmptyName,

    /// The token endpoint is empty.
    #[error("token endpoint must not be empty")]
    EmptyTokenEndpoint,

    /// A confidential client was configured without both halves of its
    /// credentials.
    #[error("confidential client requires both client_id and client_secret")]
    IncompleteClientCredentials,
}
