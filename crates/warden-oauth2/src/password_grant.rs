//! OAuth2 Resource Owner Password Credentials grant (RFC 6749 §4.3), with
//! refresh (§6) and optional revocation (RFC 7009).
//!
//! # Token lifecycle
//!
//! ```text
//! authenticate ──→ token endpoint (grant_type=password)
//!      │
//!      └─ schedule ──→ [RefreshTimer] ──(expires_at - offset)──→ refresh
//!                            ▲                                     │
//!                            └──────────── schedule ◄──────────────┘
//!                                                                  │
//!                                              broadcast ◄─────────┘
//!
//! invalidate ──→ revocation endpoint (one POST per token), cancel timer
//! ```
//!
//! Every scheduling decision captures `now` once and uses it for all of
//! its comparisons.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use tokio::sync::broadcast;
use warden_protocol::expiry::{absolutize_expiration, is_expired, now_millis, refresh_delay};
use warden_protocol::{Credentials, ProtocolError, SessionData, decode_response_body, encode_form};
use warden_session::{Authenticator, SessionError};
use warden_transport::{HttpClient, HttpRequest, HttpResponse};

use crate::identity::{ClientIdentity, ConfidentialClient, PublicClient};
use crate::{OAuth2Error, PasswordGrantConfig, RefreshTimer};

/// Name this authenticator registers under unless told otherwise.
pub const DEFAULT_NAME: &str = "oauth2-password-grant";

/// Buffered refreshed sessions per subscriber.
const UPDATE_CHANNEL_SIZE: usize = 16;

/// Replaces the built-in restore logic. See
/// [`OAuth2PasswordGrantBuilder::restore_with`].
pub type RestoreHook =
    Arc<dyn Fn(SessionData) -> BoxFuture<'static, Result<SessionData, SessionError>> + Send + Sync>;

/// The OAuth2 password-grant [`Authenticator`].
///
/// Cheap to clone: clones share the same refresh timer, so cloning never
/// creates a second outstanding refresh.
#[derive(Clone)]
pub struct OAuth2PasswordGrant {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    config: PasswordGrantConfig,
    http: Arc<dyn HttpClient>,
    /// Computed once at build time.
    client_authorization: Option<String>,
    timer: RefreshTimer,
    /// Bumped whenever the session is replaced or torn down. A refresh
    /// started under an older epoch neither re-arms the timer nor publishes.
    epoch: AtomicU64,
    updates: broadcast::Sender<SessionData>,
    restore_hook: Option<RestoreHook>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`OAuth2PasswordGrant`].
///
/// ```rust
/// use std::sync::Arc;
/// use warden_oauth2::{OAuth2PasswordGrant, PasswordGrantConfig};
/// use warden_session::Authenticator;
/// use warden_transport::MockHttpClient;
///
/// let authenticator = OAuth2PasswordGrant::builder()
///     .config(PasswordGrantConfig {
///         server_token_revocation_endpoint: Some("/revoke".into()),
///         ..Default::default()
///     })
///     .http_client(Arc::new(MockHttpClient::new()))
///     .build()
///     .unwrap();
///
/// assert_eq!(authenticator.name(), "oauth2-password-grant");
/// ```
pub struct OAuth2PasswordGrantBuilder {
    name: String,
    config: PasswordGrantConfig,
    http: Option<Arc<dyn HttpClient>>,
    identity: Option<Box<dyn ClientIdentity>>,
    restore_hook: Option<RestoreHook>,
}

impl OAuth2PasswordGrantBuilder {
    fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            config: PasswordGrantConfig::default(),
            http: None,
            identity: None,
            restore_hook: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(mut self, config: PasswordGrantConfig) -> Self {
        self.config = config;
        self
    }

    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Overrides the client identity otherwise derived from
    /// `config.client_id` / `config.client_secret`.
    pub fn client_identity(mut self, identity: impl ClientIdentity) -> Self {
        self.identity = Some(Box::new(identity));
        self
    }

    /// Restores stored sessions with `restore` instead of the expiry and
    /// refresh checks. No refresh is scheduled for a session restored this
    /// way.
    pub fn restore_with<F, Fut>(mut self, restore: F) -> Self
    where
        F: Fn(SessionData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SessionData, SessionError>> + Send + 'static,
    {
        self.restore_hook = Some(Arc::new(move |data| restore(data).boxed()));
        self
    }

    pub(crate) fn restore_hook(mut self, hook: Option<RestoreHook>) -> Self {
        self.restore_hook = hook;
        self
    }

    pub fn build(self) -> Result<OAuth2PasswordGrant, OAuth2Error> {
        if self.name.is_empty() {
            return Err(OAuth2Error::EmptyName);
        }
        if self.config.server_token_endpoint.is_empty() {
            return Err(OAuth2Error::EmptyTokenEndpoint);
        }
        let http = self.http.ok_or(OAuth2Error::MissingHttpClient)?;

        let client_authorization = match self.identity {
            Some(identity) => identity.authorization(),
            None => identity_from_config(&self.config)?.authorization(),
        };

        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);

        tracing::debug!(
            name = %self.name,
            token_endpoint = %self.config.server_token_endpoint,
            revocation = self.config.revocation_endpoint().is_some(),
            refresh = self.config.refresh_access_tokens,
            "password grant authenticator built"
        );

        Ok(OAuth2PasswordGrant {
            inner: Arc::new(Inner {
                name: self.name,
                config: self.config,
                http,
                client_authorization,
                timer: RefreshTimer::new(),
                epoch: AtomicU64::new(0),
                updates,
                restore_hook: self.restore_hook,
            }),
        })
    }
}

fn identity_from_config(config: &PasswordGrantConfig) -> Result<Box<dyn ClientIdentity>, OAuth2Error> {
    match (&config.client_id, &config.client_secret) {
        (_, None) => Ok(Box::new(PublicClient::new(config.client_id.clone()))),
        (Some(id), Some(secret)) => Ok(Box::new(ConfidentialClient::new(id, secret)?)),
        (None, Some(_)) => Err(OAuth2Error::IncompleteClientCredentials),
    }
}

// ---------------------------------------------------------------------------
// OAuth2PasswordGrant
// ---------------------------------------------------------------------------

impl OAuth2PasswordGrant {
    pub fn builder() -> OAuth2PasswordGrantBuilder {
        OAuth2PasswordGrantBuilder::new()
    }

    pub fn config(&self) -> &PasswordGrantConfig {
        &self.inner.config
    }

    /// Exchanges a refresh token for a new access token right now.
    ///
    /// `expires_in` and `refresh_token` are reused when the server's
    /// response omits them. On success the next refresh is scheduled and
    /// the new session is published to subscribers.
    ///
    /// Not serialized against the scheduled refresh; calling this while a
    /// timer is about to fire can refresh twice.
    pub async fn refresh_access_token(
        &self,
        expires_in: Option<i64>,
        refresh_token: Option<&str>,
    ) -> Result<SessionData, SessionError> {
        let epoch = self.inner.current_epoch();
        self.inner
            .refresh_access_token(epoch, expires_in, refresh_token)
            .await
    }

    /// Schedules a refresh ahead of the token's expiry, replacing any
    /// pending one. Does nothing when refreshing is disabled, without a
    /// refresh token, or without expiry information.
    pub fn schedule_access_token_refresh(
        &self,
        expires_in: Option<i64>,
        expires_at: Option<i64>,
        refresh_token: Option<&str>,
    ) {
        let epoch = self.inner.current_epoch();
        self.inner
            .schedule(epoch, expires_in, expires_at, refresh_token, now_millis());
    }

    /// `true` while a refresh is waiting to fire.
    pub fn has_scheduled_refresh(&self) -> bool {
        self.inner.timer.is_armed()
    }
}

impl std::fmt::Debug for OAuth2PasswordGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2PasswordGrant")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("scheduled_refresh", &self.inner.timer.is_armed())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Authenticator for OAuth2PasswordGrant {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<SessionData, SessionError> {
        let inner = &self.inner;
        let mut form = vec![
            ("grant_type", "password".to_string()),
            ("username", credentials.identification),
            ("password", credentials.password),
        ];
        if let Some(scope) = credentials.scope.to_param() {
            form.push(("scope", scope));
        }

        let mut data = inner
            .post(&inner.config.server_token_endpoint, &form, &credentials.headers)
            .await?;
        if !data.has_access_token() {
            return Err(SessionError::MissingAccessToken);
        }

        // A new session supersedes any refresh still in flight.
        let epoch = inner.next_epoch();
        let now = now_millis();
        let expires_in = data.expires_in();
        let expires_at = absolutize_expiration(expires_in, now);
        inner.schedule(epoch, expires_in, expires_at, data.refresh_token(), now);

        if let Some(expires_at) = expires_at {
            data.insert(SessionData::EXPIRES_AT, expires_at);
        }
        tracing::info!(authenticator = %inner.name, "password grant succeeded");
        Ok(data)
    }

    async fn restore(&self, data: SessionData) -> Result<SessionData, SessionError> {
        let inner = &self.inner;
        if let Some(hook) = &inner.restore_hook {
            return hook(data).await;
        }

        let epoch = inner.next_epoch();
        let now = now_millis();

        if let Some(expires_at) = data.expires_at().filter(|&at| is_expired(at, now)) {
            if !inner.config.refresh_access_tokens {
                return Err(SessionError::NotRestorable(format!(
                    "access token expired at {expires_at} and refreshing is disabled"
                )));
            }
            tracing::debug!(authenticator = %inner.name, "stored token expired, refreshing");
            return inner
                .refresh_access_token(epoch, data.expires_in(), data.refresh_token())
                .await;
        }

        if !data.has_access_token() {
            return Err(SessionError::NotRestorable("no access token".into()));
        }

        inner.schedule(epoch, data.expires_in(), data.expires_at(), data.refresh_token(), now);
        Ok(data)
    }

    async fn invalidate(&self, data: SessionData) -> Result<(), SessionError> {
        let inner = &self.inner;
        inner.next_epoch();

        if let Some(endpoint) = inner.config.revocation_endpoint() {
            let forms: Vec<[(&str, &str); 2]> = [SessionData::ACCESS_TOKEN, SessionData::REFRESH_TOKEN]
                .into_iter()
                .filter_map(|hint| {
                    let token = data.get(hint)?.as_str().filter(|t| !t.is_empty())?;
                    Some([("token_type_hint", hint), ("token", token)])
                })
                .collect();

            let outcomes = join_all(forms.iter().map(|form| inner.revoke(endpoint, &form[..]))).await;
            for (form, outcome) in forms.iter().zip(outcomes) {
                if let Err(error) = outcome {
                    tracing::warn!(
                        authenticator = %inner.name,
                        token_type_hint = form[0].1,
                        %error,
                        "token revocation failed, ignoring"
                    );
                }
            }
        }

        if inner.timer.cancel() {
            tracing::debug!(authenticator = %inner.name, "pending refresh cancelled");
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<SessionData>> {
        Some(self.inner.updates.subscribe())
    }
}

// ---------------------------------------------------------------------------
// Inner: requests and scheduling
// ---------------------------------------------------------------------------

impl Inner {
    /// POSTs a form to an OAuth2 endpoint and decodes the JSON answer.
    ///
    /// Header precedence, lowest first: caller headers, client
    /// authentication, `Content-Type`.
    async fn post<V: AsRef<str>>(
        &self,
        url: &str,
        form: &[(&str, V)],
        headers: &[(String, String)],
    ) -> Result<SessionData, SessionError> {
        let response = self.send_form(url, form, headers).await?;
        decode_response_body(response.is_success(), &response.text())
            .map(SessionData::from_value)
            .map_err(rejection)
    }

    /// POSTs a revocation form. Any 2xx counts as revoked, whatever the
    /// body; servers commonly answer with nothing at all.
    async fn revoke(&self, url: &str, form: &[(&str, &str)]) -> Result<(), SessionError> {
        let response = self.send_form(url, form, &[]).await?;
        if response.is_success() {
            return Ok(());
        }
        Err(decode_response_body(false, &response.text()).map_or_else(rejection, SessionError::Rejected))
    }

    async fn send_form<V: AsRef<str>>(
        &self,
        url: &str,
        form: &[(&str, V)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, SessionError> {
        let mut request = HttpRequest::post(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(authorization) = &self.client_authorization {
            request = request.header("Authorization", authorization.as_str());
        }
        let request = request.form(encode_form(form));

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        tracing::debug!(url, status = response.status, "oauth2 endpoint answered");
        Ok(response)
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Starts a new epoch and returns it.
    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn schedule(
        self: &Arc<Self>,
        epoch: u64,
        expires_in: Option<i64>,
        expires_at: Option<i64>,
        refresh_token: Option<&str>,
        now: i64,
    ) {
        if !self.config.refresh_access_tokens {
            return;
        }
        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            return;
        };
        let Some(deadline) = expires_at.or_else(|| absolutize_expiration(expires_in, now)) else {
            return;
        };

        let delay = refresh_delay(deadline, self.config.token_refresh_offset, now);
        let weak: Weak<Self> = Arc::downgrade(self);
        let refresh_token = refresh_token.to_string();

        self.timer.arm(delay, async move {
            // The authenticator is gone; nobody is left to refresh for.
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.current_epoch() != epoch {
                return;
            }
            let _ = inner
                .refresh_access_token(epoch, expires_in, Some(&refresh_token))
                .await;
        });
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(authenticator = %self.name, delay_ms, "refresh scheduled");
    }

    async fn refresh_access_token(
        self: &Arc<Self>,
        epoch: u64,
        default_expires_in: Option<i64>,
        default_refresh_token: Option<&str>,
    ) -> Result<SessionData, SessionError> {
        let Some(refresh_token) = default_refresh_token.filter(|t| !t.is_empty()) else {
            tracing::warn!(authenticator = %self.name, "access token could not be refreshed: no refresh token");
            return Err(SessionError::RefreshFailed);
        };

        let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        let response = match self.post(&self.config.server_token_endpoint, &form, &[]).await {
            Ok(response) if response.has_access_token() => response,
            Ok(_) => {
                tracing::warn!(authenticator = %self.name, "access token could not be refreshed: {}", SessionError::MissingAccessToken);
                return Err(SessionError::RefreshFailed);
            }
            Err(error) => {
                tracing::warn!(authenticator = %self.name, %error, "access token could not be refreshed");
                return Err(SessionError::RefreshFailed);
            }
        };

        let mut defaults = SessionData::new().with(SessionData::REFRESH_TOKEN, refresh_token);
        if let Some(expires_in) = default_expires_in {
            defaults.insert(SessionData::EXPIRES_IN, expires_in);
        }
        let mut data = response.merged_over(defaults);

        let now = now_millis();
        let expires_in = data.expires_in();
        match absolutize_expiration(expires_in, now) {
            Some(expires_at) => {
                data.insert(SessionData::EXPIRES_AT, expires_at);
            }
            None => {
                data.remove(SessionData::EXPIRES_AT);
            }
        }

        if self.current_epoch() != epoch {
            tracing::debug!(authenticator = %self.name, "session replaced during refresh, not rescheduling");
            return Ok(data);
        }
        self.schedule(epoch, expires_in, None, data.refresh_token(), now);

        // No subscribers is fine.
        let _ = self.updates.send(data.clone());
        tracing::info!(authenticator = %self.name, "access token refreshed");
        Ok(data)
    }
}

fn rejection(error: ProtocolError) -> SessionError {
    match error {
        ProtocolError::Rejected(body) => SessionError::Rejected(body),
        ProtocolError::Unparsable(text) => SessionError::UnparsableResponse(text),
        other => SessionError::UnparsableResponse(other.to_string()),
    }
}
