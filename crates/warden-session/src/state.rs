//! The session record: what the application knows about its sign-in state.

use warden_protocol::SessionData;

use crate::SessionError;

/// The state machine's unit of truth.
///
/// ```text
///                  ┌──────── AuthenticateSucceeded / Restore ───────┐
///                  │                                                 ▼
///   [initial] ──→ signed out ◄── InvalidateSession / RestoreFailed ── signed in
///                  │  ▲                                              │
///                  │  └──────────── AuthenticateFailed ──────────────┘
///                  └── AuthenticateFailed (has_failed_auth, last_error)
/// ```
///
/// Invariants the reducer upholds:
/// - `is_authenticated` ⇒ `data` carries a non-empty `access_token`
///   (as far as the authenticator guarantees it)
/// - `!is_authenticated` after any transition except `Initialize` ⇒
///   `data` is empty and `authenticator` is `None`
/// - `is_restored` only ever goes from `false` to `true`; it means "the
///   boot-time restore attempt has finished", nothing more
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    /// Name of the authenticator that produced `data`.
    pub authenticator: Option<String>,
    pub is_authenticated: bool,
    pub is_restored: bool,
    /// Set by a failed login, cleared by the next successful one.
    pub has_failed_auth: bool,
    /// Why the last login failed, for display.
    pub last_error: Option<SessionError>,
    pub data: SessionData,
}

impl AuthState {
    /// The zero-value state the store boots with.
    pub fn initial() -> Self {
        Self::default()
    }
}
