//! In-process storage.

use tokio::sync::RwLock;
use warden_protocol::PersistedSession;

use crate::{Storage, StorageError};

/// Keeps the blob in memory. Cloning the blob in and out keeps callers
/// from ever holding the lock across an await.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: RwLock<PersistedSession>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out holding `session`, as if it had been persisted earlier.
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: RwLock::new(session),
        }
    }

    /// What a `restore` would return right now.
    pub async fn snapshot(&self) -> PersistedSession {
        self.slot.read().await.clone()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn persist(&self, session: &PersistedSession) -> Result<(), StorageError> {
        *self.slot.write().await = session.clone();
        Ok(())
    }

    async fn restore(&self) -> Result<PersistedSession, StorageError> {
        Ok(self.snapshot().await)
    }
}
