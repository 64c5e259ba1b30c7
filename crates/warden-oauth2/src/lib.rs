//! OAuth2 support for Warden.
//!
//! - [`OAuth2PasswordGrant`]: an [`Authenticator`](warden_session::Authenticator)
//!   for the Resource Owner Password Credentials grant, with scheduled
//!   refresh and optional revocation
//! - [`BearerAuthorizer`]: sends the access token as a bearer header
//! - [`bearer_strategy`]: both of the above in one call
//!
//! How the client identifies itself to the token endpoint is a
//! [`ClientIdentity`] strategy chosen at build time, not a subtype.

mod bearer;
mod config;
mod error;
mod identity;
mod password_grant;
mod strategy;
mod timer;

pub use bearer::BearerAuthorizer;
pub use config::{DEFAULT_TOKEN_ENDPOINT, PasswordGrantConfig};
pub use error::OAuth2Error;
pub use identity::{ClientIdentity, ConfidentialClient, PublicClient};
pub use password_grant::{DEFAULT_NAME, OAuth2PasswordGrant, OAuth2PasswordGrantBuilder, RestoreHook};
pub use strategy::{ClientKind, bearer_strategy, bearer_strategy_with_restore};
pub use timer::RefreshTimer;
