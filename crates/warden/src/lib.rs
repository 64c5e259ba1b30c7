//! # Warden
//!
//! Client-side authentication sessions: sign in against an OAuth2 token
//! endpoint, keep the access token fresh, attach it to outbound requests,
//! and remember the session across restarts.
//!
//! A [`SessionStore`] holds the one [`AuthState`] of a realm. Applications
//! talk to it through actions; the store restores the stored session on
//! boot, runs authenticators, decorates requests, and persists every change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden::prelude::*;
//!
//! # async fn run() -> Result<(), WardenError> {
//! let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new());
//! let (authenticator, authorizer) = bearer_strategy(http.clone(), "/token", ClientKind::default())?;
//!
//! let store = SessionStore::builder()
//!     .authenticator(authenticator)
//!     .authorizer(authorizer)
//!     .http_client(http)
//!     .build()
//!     .await?;
//!
//! store.authenticate(DEFAULT_NAME, Credentials::new("alice", "secret")).await?;
//! let response = store.fetch(HttpRequest::get("https://api.example.com/me")).await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod error;
mod persist;
mod store;

pub use dispatch::Outcome;
pub use error::WardenError;
pub use store::{DEFAULT_REALM, SessionStore, SessionStoreBuilder};

pub use warden_oauth2 as oauth2;
pub use warden_protocol as protocol;
pub use warden_session as session;
pub use warden_storage as storage;
pub use warden_transport as transport;

pub use warden_session::{Action, AuthState, Authenticator, Authorizer, SessionError, selectors};

pub mod prelude {
    pub use crate::{Outcome, SessionStore, SessionStoreBuilder, WardenError};
    pub use warden_oauth2::{
        BearerAuthorizer, ClientKind, DEFAULT_NAME, OAuth2PasswordGrant, PasswordGrantConfig,
        bearer_strategy,
    };
    pub use warden_protocol::{Credentials, PersistedSession, Scope, SessionData};
    pub use warden_session::{Action, AuthState, Authenticator, Authorizer, SessionError};
    pub use warden_storage::{FileStorage, MemoryStorage, Storage};
    pub use warden_transport::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
}
