//! Everything that can happen to a session.

use warden_protocol::{Credentials, PersistedSession, SessionData, TaggedSession};
use warden_transport::HttpRequest;

use crate::SessionError;

/// A session event.
///
/// Six of these are state events the reducer applies. The other two,
/// [`Authenticate`](Self::Authenticate) and [`Fetch`](Self::Fetch), are
/// requests for the store to do I/O; the reducer passes them through
/// unchanged and the store turns their outcome into state events.
#[derive(Debug, Clone)]
pub enum Action {
    /// Seed the state from whatever storage held at boot.
    Initialize(PersistedSession),

    /// Ask the named authenticator to sign in with these credentials.
    Authenticate {
        authenticator: String,
        credentials: Credentials,
    },

    /// A sign-in succeeded.
    AuthenticateSucceeded {
        authenticator: String,
        data: SessionData,
    },

    /// A sign-in failed.
    AuthenticateFailed(SessionError),

    /// Drop the current session (sign-out, or the server answered 401).
    InvalidateSession,

    /// The boot-time restore succeeded with this (tagged) data.
    Restore(TaggedSession),

    /// The boot-time restore found nothing usable.
    RestoreFailed,

    /// Send an authorized request on the application's behalf.
    Fetch(HttpRequest),
}

impl Action {
    /// Short, payload-free label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "initialize",
            Self::Authenticate { .. } => "authenticate",
            Self::AuthenticateSucceeded { .. } => "authenticate_succeeded",
            Self::AuthenticateFailed(_) => "authenticate_failed",
            Self::InvalidateSession => "invalidate_session",
            Self::Restore(_) => "restore",
            Self::RestoreFailed => "restore_failed",
            Self::Fetch(_) => "fetch",
        }
    }

    pub fn authenticate(authenticator: impl Into<String>, credentials: Credentials) -> Self {
        Self::Authenticate {
            authenticator: authenticator.into(),
            credentials,
        }
    }

    pub fn authenticate_succeeded(authenticator: impl Into<String>, data: SessionData) -> Self {
        Self::AuthenticateSucceeded {
            authenticator: authenticator.into(),
            data,
        }
    }
}
