//! End-to-end tests for the session store.
//!
//! The token server and the application API are one `MockHttpClient`.
//! Storage is a `MemoryStorage` unless the test is about files. Persistence
//! runs in the background, so tests call `flush()` before reading storage.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use warden::prelude::*;
use warden::storage::StorageError;
use warden_protocol::expiry::now_millis;
use warden_transport::{Method, MockHttpClient};

// =========================================================================
// Helpers
// =========================================================================

const TOKEN: &str = "/token";
const REVOKE: &str = "/revoke";
const API: &str = "/me";

/// Authenticator double: accepts the password "good", restores any data
/// with an access token after `restore_delay`.
struct Scripted {
    name: &'static str,
    token: &'static str,
    restore_delay: Duration,
}

impl Scripted {
    fn named(name: &'static str) -> Self {
        Self {
            name,
            token: "scripted-token",
            restore_delay: Duration::ZERO,
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<SessionData, SessionError> {
        if credentials.password == "good" {
            Ok(SessionData::new().with("access_token", self.token))
        } else {
            Err(SessionError::Rejected(json!({ "error": "invalid_grant" })))
        }
    }

    async fn restore(&self, data: SessionData) -> Result<SessionData, SessionError> {
        tokio::time::sleep(self.restore_delay).await;
        if data.has_access_token() {
            Ok(data)
        } else {
            Err(SessionError::NotRestorable("no access token".into()))
        }
    }
}

fn stored(authenticator: &str, token: &str) -> PersistedSession {
    PersistedSession::new(
        Some(authenticator.into()),
        SessionData::new().with("access_token", token),
    )
}

fn oauth2(http: &Arc<MockHttpClient>, config: PasswordGrantConfig) -> OAuth2PasswordGrant {
    OAuth2PasswordGrant::builder()
        .config(config)
        .http_client(http.clone())
        .build()
        .unwrap()
}

async fn oauth2_store(
    http: &Arc<MockHttpClient>,
    config: PasswordGrantConfig,
    storage: Arc<MemoryStorage>,
) -> SessionStore {
    let store = SessionStore::builder()
        .authenticator(oauth2(http, config))
        .authorizer(BearerAuthorizer)
        .storage(storage)
        .http_client(http.clone())
        .build()
        .await
        .unwrap();
    store.wait_restored().await;
    store
}

async fn signed_in(http: &Arc<MockHttpClient>, config: PasswordGrantConfig) -> SessionStore {
    http.respond(Method::Post, TOKEN, 200, r#"{"access_token":"tok"}"#);
    let store = oauth2_store(http, config, Arc::new(MemoryStorage::new())).await;
    let state = store
        .authenticate(DEFAULT_NAME, Credentials::new("u", "p"))
        .await
        .unwrap();
    assert!(state.is_authenticated);
    store
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn test_build_without_authenticator_fails() {
    let result = SessionStore::builder().realm("app").build().await;

    match result {
        Err(WardenError::NoAuthenticator { realm }) => assert_eq!(realm, "app"),
        other => panic!("expected NoAuthenticator, got {other:?}"),
    }
}

#[tokio::test]
async fn test_build_with_both_authenticator_options_fails() {
    let result = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .authenticators(vec![Arc::new(Scripted::named("b"))])
        .build()
        .await;

    assert!(matches!(result, Err(WardenError::ConflictingAuthenticators { .. })));
}

#[tokio::test]
async fn test_build_with_empty_authenticator_list_fails() {
    let result = SessionStore::builder().authenticators(Vec::new()).build().await;

    assert!(matches!(result, Err(WardenError::EmptyAuthenticatorList { .. })));
}

#[tokio::test]
async fn test_build_with_duplicate_names_fails() {
    let result = SessionStore::builder()
        .authenticators(vec![
            Arc::new(Scripted::named("same")),
            Arc::new(Scripted::named("same")),
        ])
        .build()
        .await;

    match result {
        Err(WardenError::DuplicateAuthenticator { name, .. }) => assert_eq!(name, "same"),
        other => panic!("expected DuplicateAuthenticator, got {other:?}"),
    }
}

#[tokio::test]
async fn test_build_with_corrupt_storage_starts_signed_out() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::in_dir(dir.path());
    std::fs::write(storage.path(), b"{ not json").unwrap();

    let store = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .storage(Arc::new(storage))
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let state = store.wait_restored().await;
    assert!(!state.is_authenticated);
    assert!(state.is_restored);
}

#[tokio::test]
async fn test_build_with_unreadable_storage_fails() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be: reading it is an I/O error.
    let storage = FileStorage::new(dir.path());

    let result = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .storage(Arc::new(storage))
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await;

    assert!(matches!(
        result,
        Err(WardenError::Storage(StorageError::Io { .. }))
    ));
}

// =========================================================================
// Boot restore
// =========================================================================

#[tokio::test]
async fn test_boot_restores_stored_session() {
    let storage = Arc::new(MemoryStorage::with_session(stored("a", "kept")));

    let store = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .storage(storage)
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let state = store.wait_restored().await;
    assert!(state.is_authenticated);
    assert!(state.is_restored);
    assert_eq!(state.authenticator.as_deref(), Some("a"));
    assert_eq!(state.data.access_token(), Some("kept"));
}

#[tokio::test]
async fn test_boot_with_empty_storage_fails_restore() {
    let storage = Arc::new(MemoryStorage::new());

    let store = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .storage(storage.clone())
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let state = store.wait_restored().await;
    assert!(!state.is_authenticated);
    assert!(state.is_restored);
    assert!(state.last_error.is_none(), "a failed restore is not an error");
    assert!(!state.has_failed_auth);
}

#[tokio::test]
async fn test_boot_with_unknown_tag_fails_restore_and_clears_storage() {
    let storage = Arc::new(MemoryStorage::with_session(stored("gone", "kept")));

    let store = SessionStore::builder()
        .authenticators(vec![Arc::new(Scripted::named("a"))])
        .storage(storage.clone())
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let state = store.wait_restored().await;
    store.flush().await;
    assert!(!state.is_authenticated);
    assert!(state.data.is_empty());
    assert_eq!(storage.snapshot().await, PersistedSession::empty());
}

#[tokio::test(start_paused = true)]
async fn test_boot_state_is_initialized_from_storage_before_restore() {
    let storage = Arc::new(MemoryStorage::with_session(stored("a", "kept")));
    let slow = Scripted {
        restore_delay: Duration::from_secs(5),
        ..Scripted::named("a")
    };

    let store = SessionStore::builder()
        .authenticator(slow)
        .storage(storage)
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let state = store.state();
    assert!(!state.is_restored);
    assert!(!state.is_authenticated);
    assert_eq!(state.data.access_token(), Some("kept"));
}

#[tokio::test(start_paused = true)]
async fn test_authenticate_waits_for_boot_restore() {
    let storage = Arc::new(MemoryStorage::with_session(stored("a", "stale")));
    let slow = Scripted {
        token: "fresh",
        restore_delay: Duration::from_secs(5),
        ..Scripted::named("a")
    };
    let store = SessionStore::builder()
        .authenticator(slow)
        .storage(storage)
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let state = store
        .authenticate("a", Credentials::new("u", "good"))
        .await
        .unwrap();

    assert_eq!(state.data.access_token(), Some("fresh"));
    assert!(state.is_restored);
    // The restore already landed; nothing can overwrite the sign-in later.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.state().data.access_token(), Some("fresh"));
}

#[tokio::test]
async fn test_boot_with_expired_token_refreshes_and_persists() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(Method::Post, TOKEN, 200, r#"{"access_token":"tok2"}"#);
    let data = SessionData::new()
        .with("access_token", "old")
        .with("refresh_token", "r")
        .with("expires_in", 100)
        .with("expires_at", now_millis() - 1_000);
    let storage = Arc::new(MemoryStorage::with_session(PersistedSession::new(
        Some(DEFAULT_NAME.into()),
        data,
    )));

    let store = oauth2_store(&http, PasswordGrantConfig::default(), storage.clone()).await;
    store.flush().await;

    let state = store.state();
    assert!(state.is_authenticated);
    assert_eq!(state.data.access_token(), Some("tok2"));
    assert_eq!(state.data.refresh_token(), Some("r"));
    let (tag, persisted) = storage.snapshot().await.into_parts();
    assert_eq!(tag.as_deref(), Some(DEFAULT_NAME));
    assert_eq!(persisted.access_token(), Some("tok2"));
}

// =========================================================================
// Authenticate
// =========================================================================

#[tokio::test]
async fn test_authenticate_success_updates_state_and_storage() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(
        Method::Post,
        TOKEN,
        200,
        r#"{"access_token":"tok","token_type":"bearer"}"#,
    );
    let storage = Arc::new(MemoryStorage::new());
    let store = oauth2_store(&http, PasswordGrantConfig::default(), storage.clone()).await;

    let state = store
        .authenticate(DEFAULT_NAME, Credentials::new("alice", "secret"))
        .await
        .unwrap();
    store.flush().await;

    assert!(state.is_authenticated);
    assert_eq!(state.authenticator.as_deref(), Some(DEFAULT_NAME));
    assert_eq!(state.data.access_token(), Some("tok"));
    assert_eq!(
        state.data.get("token_type"),
        Some(&json!("bearer")),
        "unknown server fields are kept"
    );
    assert_eq!(
        storage.snapshot().await,
        PersistedSession::new(Some(DEFAULT_NAME.into()), state.data.clone())
    );
}

#[tokio::test]
async fn test_authenticate_rejected_records_failure() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(Method::Post, TOKEN, 400, r#"{"error":"invalid_grant"}"#);
    let store = oauth2_store(&http, PasswordGrantConfig::default(), Arc::new(MemoryStorage::new())).await;

    let state = store
        .authenticate(DEFAULT_NAME, Credentials::new("alice", "wrong"))
        .await
        .unwrap();

    assert!(!state.is_authenticated);
    assert!(state.has_failed_auth);
    assert_eq!(
        state.last_error,
        Some(SessionError::Rejected(json!({ "error": "invalid_grant" })))
    );
}

#[tokio::test]
async fn test_authenticate_unknown_name_errors() {
    let store = SessionStore::builder()
        .authenticators(vec![
            Arc::new(Scripted::named("a")),
            Arc::new(Scripted::named("b")),
        ])
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let result = store.authenticate("c", Credentials::new("u", "good")).await;

    match result {
        Err(WardenError::UnknownAuthenticator(name)) => assert_eq!(name, "c"),
        other => panic!("expected UnknownAuthenticator, got {other:?}"),
    }
    assert!(!store.state().has_failed_auth, "state is untouched");
}

#[tokio::test]
async fn test_authenticate_selects_named_authenticator() {
    let store = SessionStore::builder()
        .authenticators(vec![
            Arc::new(Scripted {
                token: "from-a",
                ..Scripted::named("a")
            }),
            Arc::new(Scripted {
                token: "from-b",
                ..Scripted::named("b")
            }),
        ])
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let state = store
        .authenticate("b", Credentials::new("u", "good"))
        .await
        .unwrap();

    assert_eq!(state.authenticator.as_deref(), Some("b"));
    assert_eq!(state.data.access_token(), Some("from-b"));
}

#[tokio::test]
async fn test_dispatch_authenticate_returns_applied_state() {
    let store = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();

    let outcome = store
        .dispatch(Action::authenticate("anything", Credentials::new("u", "good")))
        .await
        .unwrap();

    let state = outcome.state().unwrap();
    assert!(state.is_authenticated);
    assert_eq!(state.authenticator.as_deref(), Some("a"));
}

// =========================================================================
// Fetch
// =========================================================================

#[tokio::test]
async fn test_fetch_injects_bearer_header() {
    let http = Arc::new(MockHttpClient::new());
    let store = signed_in(&http, PasswordGrantConfig::default()).await;
    http.respond(Method::Get, API, 200, r#"{"name":"alice"}"#);

    let response = store
        .fetch(HttpRequest::get(API).header("Accept", "application/json"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    let sent = http.last_request(Method::Get, API).unwrap();
    assert_eq!(sent.header_value("authorization"), Some("Bearer tok"));
    assert_eq!(sent.header_value("accept"), Some("application/json"));
}

#[tokio::test]
async fn test_fetch_signed_out_sends_no_authorization() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(Method::Get, API, 200, "{}");
    let store = oauth2_store(&http, PasswordGrantConfig::default(), Arc::new(MemoryStorage::new())).await;

    store.fetch(HttpRequest::get(API)).await.unwrap();

    let sent = http.last_request(Method::Get, API).unwrap();
    assert_eq!(sent.header_value("authorization"), None);
}

#[tokio::test]
async fn test_fetch_401_invalidates_and_returns_response() {
    let http = Arc::new(MockHttpClient::new());
    let store = signed_in(&http, PasswordGrantConfig::default()).await;
    http.respond(Method::Get, API, 401, r#"{"error":"expired"}"#);

    let outcome = store
        .dispatch(Action::Fetch(HttpRequest::get(API)))
        .await
        .unwrap();

    let response = outcome.response().unwrap();
    assert_eq!(response.status, 401);
    assert_eq!(response.text(), r#"{"error":"expired"}"#);
    let state = store.state();
    assert!(!state.is_authenticated);
    assert!(state.data.is_empty());
    assert!(state.authenticator.is_none());
}

#[tokio::test]
async fn test_fetch_401_revokes_tokens() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(Method::Post, REVOKE, 200, "");
    let config = PasswordGrantConfig {
        server_token_revocation_endpoint: Some(REVOKE.into()),
        ..Default::default()
    };
    let store = signed_in(&http, config).await;
    http.respond(Method::Get, API, 401, "");

    store.fetch(HttpRequest::get(API)).await.unwrap();

    assert_eq!(http.calls(Method::Post, REVOKE), 1);
    assert!(!store.state().is_authenticated);
}

#[tokio::test]
async fn test_fetch_401_while_signed_out_changes_nothing() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(Method::Get, API, 401, "");
    let store = oauth2_store(&http, PasswordGrantConfig::default(), Arc::new(MemoryStorage::new())).await;
    let before = store.state();

    let response = store.fetch(HttpRequest::get(API)).await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(store.state(), before);
}

#[tokio::test]
async fn test_fetch_other_errors_keep_session() {
    let http = Arc::new(MockHttpClient::new());
    let store = signed_in(&http, PasswordGrantConfig::default()).await;
    http.respond(Method::Get, API, 403, "");

    let response = store.fetch(HttpRequest::get(API)).await.unwrap();

    assert_eq!(response.status, 403);
    assert!(store.state().is_authenticated);
}

#[tokio::test]
async fn test_fetch_transport_failure_errors() {
    let http = Arc::new(MockHttpClient::new());
    let store = signed_in(&http, PasswordGrantConfig::default()).await;
    http.fail(Method::Get, API, "connection reset");

    let result = store.fetch(HttpRequest::get(API)).await;

    assert!(matches!(result, Err(WardenError::Transport(_))));
    assert!(store.state().is_authenticated);
}

// =========================================================================
// Invalidate and persistence
// =========================================================================

#[tokio::test]
async fn test_invalidate_session_clears_state_and_storage() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(Method::Post, TOKEN, 200, r#"{"access_token":"tok"}"#);
    let storage = Arc::new(MemoryStorage::new());
    let store = oauth2_store(&http, PasswordGrantConfig::default(), storage.clone()).await;
    store
        .authenticate(DEFAULT_NAME, Credentials::new("u", "p"))
        .await
        .unwrap();

    let state = store.invalidate_session().await;
    store.flush().await;

    assert!(!state.is_authenticated);
    assert!(state.is_restored);
    assert_eq!(storage.snapshot().await, PersistedSession::empty());
}

#[tokio::test]
async fn test_invalidate_session_survives_failed_revocation() {
    let http = Arc::new(MockHttpClient::new());
    http.fail(Method::Post, REVOKE, "unreachable");
    let config = PasswordGrantConfig {
        server_token_revocation_endpoint: Some(REVOKE.into()),
        ..Default::default()
    };
    let store = signed_in(&http, config).await;

    let outcome = store.dispatch(Action::InvalidateSession).await.unwrap();

    assert!(!outcome.state().unwrap().is_authenticated);
    assert_eq!(http.calls(Method::Post, REVOKE), 1);
}

#[tokio::test]
async fn test_dispatch_state_event_is_applied_and_persisted() {
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .storage(storage.clone())
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();
    let data = SessionData::new().with("access_token", "injected");

    store
        .dispatch(Action::authenticate_succeeded("a", data.clone()))
        .await
        .unwrap();
    store.flush().await;

    assert_eq!(
        storage.snapshot().await,
        PersistedSession::new(Some("a".into()), data)
    );
}

#[tokio::test]
async fn test_subscribe_sees_sign_in() {
    let store = SessionStore::builder()
        .authenticator(Scripted::named("a"))
        .http_client(Arc::new(MockHttpClient::new()))
        .build()
        .await
        .unwrap();
    store.wait_restored().await;
    let mut changes = store.subscribe();

    store
        .authenticate("a", Credentials::new("u", "good"))
        .await
        .unwrap();

    assert!(changes.has_changed().unwrap());
    assert!(changes.borrow_and_update().is_authenticated);
}

#[tokio::test]
async fn test_file_storage_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let build = |dir: &std::path::Path| {
        SessionStore::builder()
            .authenticator(Scripted::named("a"))
            .storage(Arc::new(FileStorage::in_dir(dir)))
            .http_client(Arc::new(MockHttpClient::new()))
            .build()
    };

    let first = build(dir.path()).await.unwrap();
    first
        .authenticate("a", Credentials::new("u", "good"))
        .await
        .unwrap();
    first.flush().await;
    drop(first);

    let second = build(dir.path()).await.unwrap();
    let state = second.wait_restored().await;
    assert!(state.is_authenticated);
    assert_eq!(state.authenticator.as_deref(), Some("a"));
    assert_eq!(state.data.access_token(), Some("scripted-token"));
}

// =========================================================================
// Background refresh
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_refreshed_tokens_reach_state_storage_and_requests() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(
        Method::Post,
        TOKEN,
        200,
        r#"{"access_token":"tok","expires_in":100,"refresh_token":"r"}"#,
    );
    http.respond(Method::Post, TOKEN, 200, r#"{"access_token":"tok2"}"#);
    http.respond(Method::Get, API, 200, "{}");
    let storage = Arc::new(MemoryStorage::new());
    let store = oauth2_store(&http, PasswordGrantConfig::default(), storage.clone()).await;
    store
        .authenticate(DEFAULT_NAME, Credentials::new("u", "p"))
        .await
        .unwrap();
    let mut changes = store.subscribe();

    let refreshed = tokio::time::timeout(
        Duration::from_secs(200),
        changes.wait_for(|s| s.data.access_token() == Some("tok2")),
    )
    .await
    .map(|seen| seen.is_ok());
    assert_eq!(refreshed, Ok(true), "refresh should land in the state");

    store.fetch(HttpRequest::get(API)).await.unwrap();
    store.flush().await;

    let sent = http.last_request(Method::Get, API).unwrap();
    assert_eq!(sent.header_value("authorization"), Some("Bearer tok2"));
    let (_, persisted) = storage.snapshot().await.into_parts();
    assert_eq!(persisted.access_token(), Some("tok2"));
    assert_eq!(persisted.refresh_token(), Some("r"));
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_stops_background_refresh() {
    let http = Arc::new(MockHttpClient::new());
    http.respond(
        Method::Post,
        TOKEN,
        200,
        r#"{"access_token":"tok","expires_in":100,"refresh_token":"r"}"#,
    );
    let store = oauth2_store(&http, PasswordGrantConfig::default(), Arc::new(MemoryStorage::new())).await;
    store
        .authenticate(DEFAULT_NAME, Credentials::new("u", "p"))
        .await
        .unwrap();

    store.invalidate_session().await;
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(http.calls(Method::Post, TOKEN), 1, "no refresh after sign-out");
    assert!(!store.state().is_authenticated);
}
