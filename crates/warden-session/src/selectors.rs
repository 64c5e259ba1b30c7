//! Read-only views over [`AuthState`].
//!
//! Application code should read the session through these rather than
//! poking at fields, so the record can grow without breaking callers.

use warden_protocol::SessionData;

use crate::{AuthState, SessionError};

pub fn data(state: &AuthState) -> &SessionData {
    &state.data
}

pub fn is_authenticated(state: &AuthState) -> bool {
    state.is_authenticated
}

pub fn authenticator(state: &AuthState) -> Option<&str> {
    state.authenticator.as_deref()
}

/// `true` once the boot-time restore attempt has finished, whatever its
/// outcome.
pub fn is_restored(state: &AuthState) -> bool {
    state.is_restored
}

pub fn last_error(state: &AuthState) -> Option<&SessionError> {
    state.last_error.as_ref()
}

pub fn has_failed_auth(state: &AuthState) -> bool {
    state.has_failed_auth
}

/// The bearer token of the current session, if signed in.
pub fn access_token(state: &AuthState) -> Option<&str> {
    if state.is_authenticated {
        state.data.access_token()
    } else {
        None
    }
}
