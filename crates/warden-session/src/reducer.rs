//! The session transition function.

use warden_protocol::SessionData;

use crate::{Action, AuthState};

/// Computes the state that follows `action`.
///
/// Pure and total: every action maps to a next state, and the I/O requests
/// ([`Action::Authenticate`], [`Action::Fetch`]) map to a copy of the
/// current one.
///
/// | Action                  | authenticator | authenticated | restored  | failed auth | last error | data        |
/// |-------------------------|---------------|---------------|-----------|-------------|------------|-------------|
/// | `Initialize`            | payload tag   | false         | false     | false       | none       | payload     |
/// | `AuthenticateSucceeded` | event's name  | true          | unchanged | false       | none       | payload     |
/// | `AuthenticateFailed`    | none          | false         | true      | true        | payload    | empty       |
/// | `InvalidateSession`     | none          | false         | true      | unchanged   | none       | empty       |
/// | `RestoreFailed`         | none          | false         | true      | unchanged   | none       | empty       |
/// | `Restore`               | payload tag   | true          | true      | unchanged   | none       | payload     |
pub fn reduce(state: &AuthState, action: &Action) -> AuthState {
    match action {
        Action::Initialize(persisted) => {
            let (authenticator, data) = persisted.clone().into_parts();
            AuthState {
                authenticator,
                data,
                ..AuthState::initial()
            }
        }

        Action::AuthenticateSucceeded {
            authenticator,
            data,
        } => AuthState {
            authenticator: Some(authenticator.clone()),
            is_authenticated: true,
            is_restored: state.is_restored,
            has_failed_auth: false,
            last_error: None,
            data: data.clone(),
        },

        Action::AuthenticateFailed(error) => AuthState {
            authenticator: None,
            is_authenticated: false,
            is_restored: true,
            has_failed_auth: true,
            last_error: Some(error.clone()),
            data: SessionData::new(),
        },

        Action::InvalidateSession | Action::RestoreFailed => signed_out(state),

        Action::Restore(tagged) => AuthState {
            authenticator: tagged.authenticator.clone(),
            is_authenticated: true,
            is_restored: true,
            has_failed_auth: state.has_failed_auth,
            last_error: None,
            data: tagged.data.clone(),
        },

        Action::Authenticate { .. } | Action::Fetch(_) => state.clone(),
    }
}

fn signed_out(state: &AuthState) -> AuthState {
    AuthState {
        authenticator: None,
        is_authenticated: false,
        is_restored: true,
        has_failed_auth: state.has_failed_auth,
        last_error: None,
        data: SessionData::new(),
    }
}
