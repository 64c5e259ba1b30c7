//! Signs in with the password grant, optionally fetches one URL with the
//! bearer token, and keeps the session in a file between runs.
//!
//! ```text
//! WARDEN_BASE_URL=https://auth.example.com \
//! WARDEN_USERNAME=alice WARDEN_PASSWORD=secret \
//!     cargo run -p password-login -- https://api.example.com/me
//! ```
//!
//! Run it twice: the second run restores the stored session and skips the
//! login. `RUST_LOG=debug` shows every state transition.

use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use url::Url;
use warden::prelude::*;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn config_from_env() -> PasswordGrantConfig {
    let mut config = PasswordGrantConfig::default();
    if let Some(endpoint) = var("WARDEN_TOKEN_ENDPOINT") {
        config.server_token_endpoint = endpoint;
    }
    config.server_token_revocation_endpoint = var("WARDEN_REVOCATION_ENDPOINT");
    config.client_id = var("WARDEN_CLIENT_ID");
    config.client_secret = var("WARDEN_CLIENT_SECRET");
    config
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let base_url: Url = var("WARDEN_BASE_URL")
        .ok_or("WARDEN_BASE_URL is not set")?
        .parse()?;
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new().with_base_url(base_url));

    let authenticator = OAuth2PasswordGrant::builder()
        .config(config_from_env())
        .http_client(http.clone())
        .build()?;

    let storage = match var("WARDEN_SESSION_FILE") {
        Some(path) => FileStorage::new(path),
        None => FileStorage::in_dir(env::temp_dir()),
    };
    tracing::info!(path = %storage.path().display(), "session file");

    let store = SessionStore::builder()
        .realm("password-login")
        .authenticator(authenticator)
        .authorizer(BearerAuthorizer)
        .storage(Arc::new(storage))
        .http_client(http)
        .build()
        .await?;

    let mut state = store.wait_restored().await;
    if state.is_authenticated {
        tracing::info!("reusing stored session");
    } else {
        let username = var("WARDEN_USERNAME").ok_or("WARDEN_USERNAME is not set")?;
        let password = var("WARDEN_PASSWORD").ok_or("WARDEN_PASSWORD is not set")?;
        let mut credentials = Credentials::new(username, password);
        if let Some(scope) = var("WARDEN_SCOPE") {
            credentials = credentials.with_scope(scope);
        }

        state = store.authenticate(DEFAULT_NAME, credentials).await?;
        if let Some(error) = &state.last_error {
            tracing::error!(%error, "sign-in failed");
            store.flush().await;
            return Err(error.clone().into());
        }
        tracing::info!("signed in");
    }

    if let Some(url) = env::args().nth(1) {
        let response = store.fetch(HttpRequest::get(url)).await?;
        tracing::info!(status = response.status, "fetched");
        println!("{}", response.text());
        if response.is_unauthorized() {
            tracing::warn!("token was refused, session dropped");
        }
    }

    store.flush().await;
    Ok(())
}
