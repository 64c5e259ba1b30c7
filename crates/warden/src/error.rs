//! Unified error type for Warden.

use warden_oauth2::OAuth2Error;
use warden_protocol::ProtocolError;
use warden_session::SessionError;
use warden_storage::StorageError;
use warden_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` convert sub-crate errors. The rest are
/// setup mistakes the store reports itself: they indicate a programming
/// error, not a condition a user can fix by retrying.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// Encoding or decoding a session document failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An outbound request produced no response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An authenticator operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An OAuth2 authenticator could not be built.
    #[error(transparent)]
    OAuth2(#[from] OAuth2Error),

    /// `Authenticate` named an authenticator this store does not have.
    #[error(
        "no authenticator with name `{0}` was found; be sure it is registered with the store"
    )]
    UnknownAuthenticator(String),

    /// Neither `authenticator` nor `authenticators` was configured.
    #[error(
        "no authenticator was given for realm `{realm}`; configure one with `authenticator` or several with `authenticators`"
    )]
    NoAuthenticator { realm: String },

    /// Both `authenticator` and `authenticators` were configured.
    #[error(
        "realm `{realm}` was given both `authenticator` and `authenticators`; use one or the other"
    )]
    ConflictingAuthenticators { realm: String },

    /// `authenticators` was configured with an empty list.
    #[error("`authenticators` for realm `{realm}` is empty")]
    EmptyAuthenticatorList { realm: String },

    /// Two authenticators share a name.
    #[error("authenticator name `{name}` is registered twice in realm `{realm}`")]
    DuplicateAuthenticator { realm: String, name: String },

    /// An authenticator has an empty name.
    #[error("authenticators must have a non-empty name (realm `{realm}`)")]
    EmptyAuthenticatorName { realm: String },
}
