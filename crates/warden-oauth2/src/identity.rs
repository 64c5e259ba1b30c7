//! Client authentication header strategies (RFC 6749 §2.3.1).
//!
//! The authenticator asks its [`ClientIdentity`] for an `Authorization`
//! value once, when it is built, and sends it with every request it makes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::OAuth2Error;

/// Produces the client's `Authorization` header value, if any.
pub trait ClientIdentity: Send + Sync + 'static {
    fn authorization(&self) -> Option<String>;
}

/// A client that cannot keep a secret (a browser, a distributed CLI).
/// Sends `Basic base64("<id>:")`, or nothing without an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicClient {
    client_id: Option<String>,
}

impl PublicClient {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client_id: client_id.filter(|id| !id.is_empty()),
        }
    }

    /// No client authentication at all.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl ClientIdentity for PublicClient {
    fn authorization(&self) -> Option<String> {
        self.client_id
            .as_deref()
            .map(|id| basic(&format!("{id}:")))
    }
}

/// A client trusted with a secret. Sends `Basic base64("<id>:<secret>")`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfidentialClient {
    client_id: String,
    client_secret: String,
}

impl ConfidentialClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, OAuth2Error> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(OAuth2Error::IncompleteClientCredentials);
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

impl std::fmt::Debug for ConfidentialClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidentialClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl ClientIdentity for ConfidentialClient {
    fn authorization(&self) -> Option<String> {
        Some(basic(&format!("{}:{}", self.client_id, self.client_secret)))
    }
}

fn basic(userpass: &str) -> String {
    format!("Basic {}", STANDARD.encode(userpass))
}
