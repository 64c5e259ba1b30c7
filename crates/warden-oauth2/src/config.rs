//! Password-grant configuration.

use std::time::Duration;

/// Default token endpoint, relative to the HTTP client's base URL.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "/token";

/// Settings for one [`OAuth2PasswordGrant`](crate::OAuth2PasswordGrant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordGrantConfig {
    /// Where password and refresh-token grants are sent.
    pub server_token_endpoint: String,

    /// Where tokens are revoked on sign-out. `None` disables revocation.
    pub server_token_revocation_endpoint: Option<String>,

    /// Whether to refresh access tokens before they expire.
    pub refresh_access_tokens: bool,

    /// How much earlier than the computed expiry to refresh.
    pub token_refresh_offset: Duration,

    /// Sent as HTTP Basic credentials on every request. Identifies the
    /// client for statistics only; a public client cannot keep it secret.
    pub client_id: Option<String>,

    /// Setting this makes the client confidential, which also requires
    /// `client_id`.
    pub client_secret: Option<String>,
}

impl Default for PasswordGrantConfig {
    fn default() -> Self {
        Self {
            server_token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            server_token_revocation_endpoint: None,
            refresh_access_tokens: true,
            token_refresh_offset: Duration::ZERO,
            client_id: None,
            client_secret: None,
        }
    }
}

impl PasswordGrantConfig {
    pub fn with_token_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            server_token_endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Revocation is on only for a configured, non-empty endpoint.
    pub(crate) fn revocation_endpoint(&self) -> Option<&str> {
        self.server_token_revocation_endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.is_empty())
    }
}
