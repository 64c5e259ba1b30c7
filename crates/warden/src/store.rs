//! `SessionStore` builder, shared state, and background tasks.
//!
//! The store owns the single [`AuthState`] of a realm and is the only
//! thing that applies actions to it. Around the pure reducer it runs three
//! kinds of background work:
//!
//! 1. **Boot restore**: once, right after build. Reads what storage held,
//!    asks the matching authenticator to restore it, and applies
//!    `Restore` or `RestoreFailed`. External dispatches wait for it.
//! 2. **Persistence**: an actor task that writes every data change to
//!    storage in order (see [`persist`](crate::persist)).
//! 3. **Refresh listeners**: one task per authenticator that publishes
//!    background token refreshes, feeding them back in as
//!    `AuthenticateSucceeded`.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, watch};
use warden_protocol::{PersistedSession, SessionData, TaggedSession};
use warden_session::{Action, AuthState, Authenticator, Authorizer, reduce};
use warden_storage::{MemoryStorage, Storage, StorageError};
use warden_transport::{HttpClient, ReqwestClient};

use crate::WardenError;
use crate::persist::{PersistHandle, spawn_persister};

/// Realm name used when none is configured.
pub const DEFAULT_REALM: &str = "default";

// ---------------------------------------------------------------------------
// Authenticator lookup
// ---------------------------------------------------------------------------

pub(crate) enum Authenticators {
    /// Used for every name, including none.
    Single(Arc<dyn Authenticator>),
    /// Matched by exact name.
    Named(Vec<Arc<dyn Authenticator>>),
}

impl Authenticators {
    pub(crate) fn find(&self, name: Option<&str>) -> Option<&Arc<dyn Authenticator>> {
        match self {
            Self::Single(authenticator) => Some(authenticator),
            Self::Named(list) => {
                let name = name?;
                list.iter().find(|a| a.name() == name)
            }
        }
    }

    fn all(&self) -> &[Arc<dyn Authenticator>] {
        match self {
            Self::Single(authenticator) => std::slice::from_ref(authenticator),
            Self::Named(list) => list,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything the store's handles and tasks share.
pub(crate) struct Shared {
    pub(crate) realm: String,
    /// The state, doubling as the change feed for subscribers.
    pub(crate) state: watch::Sender<AuthState>,
    pub(crate) authenticators: Authenticators,
    pub(crate) authorizer: Option<Arc<dyn Authorizer>>,
    pub(crate) http: Arc<dyn HttpClient>,
    pub(crate) persist: PersistHandle,
    /// Flips to `true` once the boot restore has been applied.
    pub(crate) ready: watch::Receiver<bool>,
}

impl Shared {
    /// Runs `action` through the reducer and queues a write if the
    /// session data changed. Returns the resulting state.
    pub(crate) fn apply(&self, action: &Action) -> AuthState {
        self.apply_when(action, |_| true).unwrap_or_else(|| self.snapshot())
    }

    /// Like [`apply`](Self::apply), but only if `guard` accepts the
    /// current state. Checked and applied without a gap. Returns `None`
    /// when the guard refused.
    pub(crate) fn apply_when(
        &self,
        action: &Action,
        guard: impl FnOnce(&AuthState) -> bool,
    ) -> Option<AuthState> {
        let mut outcome = None;

        self.state.send_if_modified(|state| {
            if !guard(state) {
                return false;
            }
            let next = reduce(state, action);
            // Queued under the state lock so writes land in state order.
            if next.data != state.data {
                self.persist.write(persisted_form(&next));
            }
            let modified = next != *state;
            *state = next;
            outcome = Some(state.clone());
            modified
        });

        if outcome.is_some() {
            tracing::debug!(realm = %self.realm, action = action.kind(), "action applied");
        }
        outcome
    }

    pub(crate) fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }
}

/// What gets written to storage for a state. A signed-out state is
/// written as an empty document.
fn persisted_form(state: &AuthState) -> PersistedSession {
    if state.data.is_empty() && state.authenticator.is_none() {
        PersistedSession::empty()
    } else {
        PersistedSession::new(state.authenticator.clone(), state.data.clone())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a [`SessionStore`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use warden::prelude::*;
///
/// # async fn run() -> Result<(), WardenError> {
/// let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new());
/// let (authenticator, authorizer) =
///     bearer_strategy(http.clone(), "https://auth.example.com/token", ClientKind::default())?;
///
/// let store = SessionStore::builder()
///     .authenticator(authenticator)
///     .authorizer(authorizer)
///     .storage(Arc::new(FileStorage::in_dir(".")))
///     .http_client(http)
///     .build()
///     .await?;
///
/// let state = store
///     .authenticate(DEFAULT_NAME, Credentials::new("alice", "secret"))
///     .await?;
/// assert!(state.is_authenticated);
/// # Ok(())
/// # }
/// ```
pub struct SessionStoreBuilder {
    realm: String,
    authenticator: Option<Arc<dyn Authenticator>>,
    authenticators: Option<Vec<Arc<dyn Authenticator>>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    storage: Option<Arc<dyn Storage>>,
    http: Option<Arc<dyn HttpClient>>,
}

impl SessionStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            realm: DEFAULT_REALM.to_string(),
            authenticator: None,
            authenticators: None,
            authorizer: None,
            storage: None,
            http: None,
        }
    }

    /// Names this store in logs and error messages. Useful when an
    /// application keeps several independent sessions.
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Uses one authenticator for every `Authenticate`, whatever name it
    /// carries.
    pub fn authenticator(mut self, authenticator: impl Authenticator) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Registers several authenticators, selected by name.
    pub fn authenticators(mut self, authenticators: Vec<Arc<dyn Authenticator>>) -> Self {
        self.authenticators = Some(authenticators);
        self
    }

    /// Decorates every `Fetch` with credentials from the session.
    pub fn authorizer(mut self, authorizer: impl Authorizer) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    /// Where the session survives restarts. Default: [`MemoryStorage`].
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// The client `Fetch` sends requests with. Default: [`ReqwestClient`].
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    fn validate(
        realm: &str,
        single: Option<Arc<dyn Authenticator>>,
        list: Option<Vec<Arc<dyn Authenticator>>>,
    ) -> Result<Authenticators, WardenError> {
        let realm = realm.to_string();
        let authenticators = match (single, list) {
            (None, None) => return Err(WardenError::NoAuthenticator { realm }),
            (Some(_), Some(_)) => return Err(WardenError::ConflictingAuthenticators { realm }),
            (Some(single), None) => Authenticators::Single(single),
            (None, Some(list)) if list.is_empty() => {
                return Err(WardenError::EmptyAuthenticatorList { realm });
            }
            (None, Some(list)) => Authenticators::Named(list),
        };

        let mut seen = HashSet::new();
        for authenticator in authenticators.all() {
            let name = authenticator.name();
            if name.is_empty() {
                return Err(WardenError::EmptyAuthenticatorName { realm });
            }
            if !seen.insert(name.to_string()) {
                return Err(WardenError::DuplicateAuthenticator {
                    realm,
                    name: name.to_string(),
                });
            }
        }
        Ok(authenticators)
    }

    /// Validates the configuration, loads the stored session, and starts
    /// the background tasks. Must be called within a tokio runtime.
    ///
    /// Returns as soon as the store is usable; the boot restore keeps
    /// running in the background and every dispatch waits for it.
    pub async fn build(self) -> Result<SessionStore, WardenError> {
        let authenticators = Self::validate(&self.realm, self.authenticator, self.authenticators)?;
        let realm = self.realm;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestClient::new()));

        let persisted = match storage.restore().await {
            Ok(persisted) => persisted,
            Err(StorageError::Corrupt(error)) => {
                tracing::warn!(%realm, %error, "stored session is unreadable, starting signed out");
                PersistedSession::empty()
            }
            Err(error) => return Err(error.into()),
        };

        let initial = reduce(&AuthState::initial(), &Action::Initialize(persisted.clone()));
        let (state, _) = watch::channel(initial);
        let (ready_tx, ready_rx) = watch::channel(false);
        let persist = spawn_persister(realm.clone(), storage);

        let shared = Arc::new(Shared {
            realm,
            state,
            authenticators,
            authorizer: self.authorizer,
            http,
            persist,
            ready: ready_rx,
        });

        for authenticator in shared.authenticators.all() {
            if let Some(updates) = authenticator.subscribe() {
                let name = authenticator.name().to_string();
                tokio::spawn(listen_for_refreshes(Arc::downgrade(&shared), name, updates));
            }
        }

        tokio::spawn(restore_on_boot(Arc::clone(&shared), persisted, ready_tx));

        tracing::info!(realm = %shared.realm, "session store started");
        Ok(SessionStore { shared })
    }
}

impl Default for SessionStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn restore_on_boot(
    shared: Arc<Shared>,
    persisted: PersistedSession,
    ready: watch::Sender<bool>,
) {
    let (tag, data) = persisted.into_parts();

    let action = match shared.authenticators.find(tag.as_deref()) {
        Some(authenticator) => match authenticator.restore(data).await {
            Ok(data) => {
                let name = authenticator.name().to_string();
                tracing::info!(realm = %shared.realm, authenticator = %name, "session restored");
                Action::Restore(TaggedSession::new(Some(name), data))
            }
            Err(error) => {
                tracing::info!(realm = %shared.realm, %error, "no session to restore");
                Action::RestoreFailed
            }
        },
        None => {
            tracing::info!(
                realm = %shared.realm,
                authenticator = tag.as_deref().unwrap_or("<none>"),
                "no authenticator for stored session"
            );
            Action::RestoreFailed
        }
    };

    shared.apply(&action);
    ready.send_replace(true);
}

/// Feeds refreshed tokens back into the state, for as long as the session
/// is still signed in with the authenticator that refreshed them. Holds
/// the store weakly so it does not keep it alive.
async fn listen_for_refreshes(
    shared: Weak<Shared>,
    name: String,
    mut updates: broadcast::Receiver<SessionData>,
) {
    loop {
        let data = match updates.recv().await {
            Ok(data) => data,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(authenticator = %name, skipped, "missed refreshed sessions");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };

        let action = Action::authenticate_succeeded(name.clone(), data);
        let applied = shared.apply_when(&action, |state| {
            state.is_authenticated && state.authenticator.as_deref() == Some(name.as_str())
        });
        if applied.is_some() {
            tracing::debug!(realm = %shared.realm, authenticator = %name, "refreshed session applied");
        } else {
            tracing::debug!(realm = %shared.realm, authenticator = %name, "refreshed session ignored, signed out");
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Handle to a running session store. Cheap to clone; all clones share
/// one state.
#[derive(Clone)]
pub struct SessionStore {
    pub(crate) shared: Arc<Shared>,
}

impl SessionStore {
    /// Creates a new builder.
    pub fn builder() -> SessionStoreBuilder {
        SessionStoreBuilder::new()
    }

    pub fn realm(&self) -> &str {
        &self.shared.realm
    }

    /// The current state.
    pub fn state(&self) -> AuthState {
        self.shared.snapshot()
    }

    /// A feed of state changes. The receiver sees the current state
    /// immediately and every change after.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.shared.state.subscribe()
    }

    /// Waits for the boot restore to finish, then returns the state.
    pub async fn wait_restored(&self) -> AuthState {
        let mut ready = self.shared.ready.clone();
        // The sender only disappears if the restore task panicked; there is
        // nothing left to wait for then.
        let _ = ready.wait_for(|&done| done).await;
        self.state()
    }

    /// Waits until every session change so far has been handed to storage.
    pub async fn flush(&self) {
        self.shared.persist.flush().await;
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("realm", &self.shared.realm)
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}
