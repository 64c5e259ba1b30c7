//! Extension points: how a session is obtained and how it is used.
//!
//! Warden's state machine does not know any authentication protocol. It
//! delegates to an [`Authenticator`] (OAuth2 password grant, a test double,
//! anything else) to turn credentials into [`SessionData`], and to an
//! [`Authorizer`] to turn session data into request headers.
//!
//! # Why traits?
//!
//! The same store runs against a real token endpoint in production and an
//! in-memory fake in tests, and an application may register several
//! authenticators side by side under different names. `#[async_trait]`
//! keeps the trait object-safe so the store can hold them as
//! `Arc<dyn Authenticator>`.

use tokio::sync::broadcast;
use warden_protocol::{Credentials, SessionData};

use crate::SessionError;

/// Implements one authentication protocol.
///
/// # Trait bounds
///
/// - `Send + Sync` → the store calls it from whichever task dispatches.
/// - `'static` → it lives as long as the store.
///
/// # Example
///
/// ```rust
/// use warden_protocol::{Credentials, SessionData};
/// use warden_session::{Authenticator, SessionError};
///
/// /// Accepts one hard-coded password. Development only!
/// struct DevAuthenticator;
///
/// #[async_trait::async_trait]
/// impl Authenticator for DevAuthenticator {
///     fn name(&self) -> &str {
///         "dev"
///     }
///
///     async fn authenticate(
///         &self,
///         credentials: Credentials,
///     ) -> Result<SessionData, SessionError> {
///         if credentials.password != "letmein" {
///             return Err(SessionError::Rejected(
///                 serde_json::json!({ "error": "invalid_grant" }),
///             ));
///         }
///         Ok(SessionData::new().with("access_token", credentials.identification))
///     }
///
///     async fn restore(&self, data: SessionData) -> Result<SessionData, SessionError> {
///         if data.has_access_token() {
///             Ok(data)
///         } else {
///             Err(SessionError::NotRestorable("no access token".into()))
///         }
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// The name session data is tagged with, and the key
    /// `Action::Authenticate` selects this authenticator by.
    fn name(&self) -> &str;

    /// Exchanges credentials for session data.
    async fn authenticate(&self, credentials: Credentials) -> Result<SessionData, SessionError>;

    /// Rebuilds a session from previously persisted data.
    ///
    /// Resolves with the data the session should continue with: usually
    /// the input unchanged, or refreshed tokens when the stored ones had
    /// expired. The default rejects, so an authenticator without restore
    /// support always starts signed out.
    async fn restore(&self, data: SessionData) -> Result<SessionData, SessionError> {
        let _ = data;
        Err(SessionError::Unsupported("restore"))
    }

    /// Tears the session down on the authenticator's side (token
    /// revocation, cancelling background refreshes). Default: nothing to do.
    async fn invalidate(&self, data: SessionData) -> Result<(), SessionError> {
        let _ = data;
        Ok(())
    }

    /// A feed of session data produced in the background (scheduled token
    /// refreshes), if this authenticator has one.
    fn subscribe(&self) -> Option<broadcast::Receiver<SessionData>> {
        None
    }
}

/// Decorates outbound requests with credentials derived from session data.
///
/// Called synchronously right before each authorized request. `emit`
/// receives header name/value pairs to attach.
pub trait Authorizer: Send + Sync + 'static {
    fn authorize(&self, data: &SessionData, emit: &mut dyn FnMut(&str, &str));
}

/// Any matching closure is an authorizer.
impl<F> Authorizer for F
where
    F: Fn(&SessionData, &mut dyn FnMut(&str, &str)) + Send + Sync + 'static,
{
    fn authorize(&self, data: &SessionData, emit: &mut dyn FnMut(&str, &str)) {
        self(data, emit)
    }
}
