//! Action dispatch: one handler per action kind.
//!
//! State events go straight to the reducer. `Authenticate` and `Fetch` do
//! I/O first and then apply whatever state event their outcome implies.
//! Every entry point waits for the boot restore before it runs.

use warden_protocol::Credentials;
use warden_session::{Action, AuthState};
use warden_transport::{HttpRequest, HttpResponse};

use crate::{SessionStore, WardenError};

/// What a dispatched action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The state after the action was applied.
    Applied(AuthState),
    /// The response to a `Fetch`, whatever its status.
    Response(HttpResponse),
}

impl Outcome {
    pub fn state(&self) -> Option<&AuthState> {
        match self {
            Self::Applied(state) => Some(state),
            Self::Response(_) => None,
        }
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::Applied(_) => None,
        }
    }
}

impl SessionStore {
    /// Routes an action to its handler.
    ///
    /// `Authenticate` resolves with the resulting state whether sign-in
    /// succeeded or not; a failure shows up as `has_failed_auth` and
    /// `last_error`. The only `Err`s are an unknown authenticator name and,
    /// for `Fetch`, a request that got no response at all.
    pub async fn dispatch(&self, action: Action) -> Result<Outcome, WardenError> {
        match action {
            Action::Authenticate {
                authenticator,
                credentials,
            } => self
                .authenticate(&authenticator, credentials)
                .await
                .map(Outcome::Applied),
            Action::Fetch(request) => self.fetch(request).await.map(Outcome::Response),
            Action::InvalidateSession => Ok(Outcome::Applied(self.invalidate_session().await)),
            other => {
                self.wait_restored().await;
                Ok(Outcome::Applied(self.shared.apply(&other)))
            }
        }
    }

    /// Signs in with the named authenticator.
    pub async fn authenticate(
        &self,
        name: &str,
        credentials: Credentials,
    ) -> Result<AuthState, WardenError> {
        self.wait_restored().await;

        let authenticator = self
            .shared
            .authenticators
            .find(Some(name))
            .cloned()
            .ok_or_else(|| WardenError::UnknownAuthenticator(name.to_string()))?;

        let action = match authenticator.authenticate(credentials).await {
            Ok(data) => {
                tracing::info!(realm = %self.shared.realm, authenticator = authenticator.name(), "authenticated");
                Action::authenticate_succeeded(authenticator.name(), data)
            }
            Err(error) => {
                tracing::info!(realm = %self.shared.realm, authenticator = authenticator.name(), %error, "authentication failed");
                Action::AuthenticateFailed(error)
            }
        };

        Ok(self.shared.apply(&action))
    }

    /// Sends `request` with the session's credentials attached.
    ///
    /// A 401 while signed in invalidates the session; the 401 is still
    /// returned.
    pub async fn fetch(&self, mut request: HttpRequest) -> Result<HttpResponse, WardenError> {
        self.wait_restored().await;

        let before = self.state();
        if let Some(authorizer) = &self.shared.authorizer {
            authorizer.authorize(&before.data, &mut |name, value| {
                request.set_header(name, value);
            });
        }

        tracing::debug!(realm = %self.shared.realm, method = %request.method, url = %request.url, "fetch");
        let response = self.shared.http.send(request).await?;

        if response.is_unauthorized() && before.is_authenticated {
            tracing::info!(realm = %self.shared.realm, "server answered 401, invalidating session");
            self.invalidate_session().await;
        }

        Ok(response)
    }

    /// Signs out. The active authenticator gets to tear the session down
    /// first (revocation, cancelling refreshes); its failures are logged
    /// and never stop the local sign-out.
    pub async fn invalidate_session(&self) -> AuthState {
        self.wait_restored().await;

        let current = self.state();
        if current.is_authenticated {
            let authenticator = self
                .shared
                .authenticators
                .find(current.authenticator.as_deref())
                .cloned();
            if let Some(authenticator) = authenticator {
                if let Err(error) = authenticator.invalidate(current.data).await {
                    tracing::warn!(realm = %self.shared.realm, authenticator = authenticator.name(), %error, "authenticator failed to invalidate session");
                }
            }
        }

        let state = self.shared.apply(&Action::InvalidateSession);
        tracing::info!(realm = %self.shared.realm, "session invalidated");
        state
    }
}
