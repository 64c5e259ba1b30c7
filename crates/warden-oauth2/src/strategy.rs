//! One-call setup for the common case: a password-grant authenticator
//! paired with the bearer authorizer.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use warden_protocol::SessionData;
use warden_session::SessionError;
use warden_transport::HttpClient;

use crate::identity::{ConfidentialClient, PublicClient};
use crate::{BearerAuthorizer, OAuth2Error, OAuth2PasswordGrant, PasswordGrantConfig, RestoreHook};

/// How the application authenticates itself to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKind {
    /// Cannot keep a secret (browser, distributed binary).
    Public { client_id: Option<String> },
    /// Runs where its secret is safe (server-side, trusted device).
    Confidential {
        client_id: String,
        client_secret: String,
    },
}

impl Default for ClientKind {
    fn default() -> Self {
        Self::Public { client_id: None }
    }
}

/// Builds the authenticator/authorizer pair for a token endpoint.
///
/// The authenticator is named [`DEFAULT_NAME`](crate::DEFAULT_NAME) and
/// uses the default [`PasswordGrantConfig`] apart from the endpoint.
///
/// ```rust
/// use std::sync::Arc;
/// use warden_oauth2::{ClientKind, bearer_strategy};
/// use warden_transport::MockHttpClient;
///
/// let (authenticator, authorizer) = bearer_strategy(
///     Arc::new(MockHttpClient::new()),
///     "https://auth.example.com/oauth/token",
///     ClientKind::Confidential {
///         client_id: "cli".into(),
///         client_secret: "s3cret".into(),
///     },
/// )
/// .unwrap();
/// # let _ = (authenticator, authorizer);
/// ```
pub fn bearer_strategy(
    http: Arc<dyn HttpClient>,
    token_endpoint: impl Into<String>,
    client: ClientKind,
) -> Result<(OAuth2PasswordGrant, BearerAuthorizer), OAuth2Error> {
    build_strategy(http, token_endpoint.into(), client, None)
}

/// [`bearer_strategy`] with the authenticator's restore replaced by
/// `restore`, for applications that validate stored sessions their own way.
///
/// ```rust
/// use std::sync::Arc;
/// use warden_oauth2::{ClientKind, bearer_strategy_with_restore};
/// use warden_session::SessionError;
/// use warden_transport::MockHttpClient;
///
/// let (authenticator, _) = bearer_strategy_with_restore(
///     Arc::new(MockHttpClient::new()),
///     "/token",
///     ClientKind::default(),
///     |data| async move {
///         if data.has_access_token() {
///             Ok(data)
///         } else {
///             Err(SessionError::NotRestorable("signed out".into()))
///         }
///     },
/// )
/// .unwrap();
/// # let _ = authenticator;
/// ```
pub fn bearer_strategy_with_restore<F, Fut>(
    http: Arc<dyn HttpClient>,
    token_endpoint: impl Into<String>,
    client: ClientKind,
    restore: F,
) -> Result<(OAuth2PasswordGrant, BearerAuthorizer), OAuth2Error>
where
    F: Fn(SessionData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SessionData, SessionError>> + Send + 'static,
{
    let hook: RestoreHook = Arc::new(move |data| restore(data).boxed());
    build_strategy(http, token_endpoint.into(), client, Some(hook))
}

fn build_strategy(
    http: Arc<dyn HttpClient>,
    token_endpoint: String,
    client: ClientKind,
    restore_hook: Option<RestoreHook>,
) -> Result<(OAuth2PasswordGrant, BearerAuthorizer), OAuth2Error> {
    let builder = OAuth2PasswordGrant::builder()
        .config(PasswordGrantConfig::with_token_endpoint(token_endpoint))
        .http_client(http)
        .restore_hook(restore_hook);

    let authenticator = match client {
        ClientKind::Public { client_id } => {
            builder.client_identity(PublicClient::new(client_id)).build()?
        }
        ClientKind::Confidential {
            client_id,
            client_secret,
        } => builder
            .client_identity(ConfidentialClient::new(client_id, client_secret)?)
            .build()?,
    };

    Ok((authenticator, BearerAuthorizer))
}
