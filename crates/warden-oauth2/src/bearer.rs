//! Bearer token authorizer (RFC 6750 §2.1).

use warden_protocol::SessionData;
use warden_session::Authorizer;

/// Adds `Authorization: Bearer <access_token>` when the session has a
/// non-empty access token, and nothing otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerAuthorizer;

impl Authorizer for BearerAuthorizer {
    fn authorize(&self, data: &SessionData, emit: &mut dyn FnMut(&str, &str)) {
        if let Some(token) = data.access_token().filter(|t| !t.is_empty()) {
            emit("Authorization", &format!("Bearer {token}"));
        }
    }
}
