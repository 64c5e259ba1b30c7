//! Persistence backends for Warden sessions.
//!
//! The store writes the current session to a [`Storage`] whenever its data
//! changes and reads it back once at boot. A backend holds exactly one
//! [`PersistedSession`] blob: the last write wins, there is no versioning.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: lives and dies with the process. The default, and
//!   what tests use.
//! - [`FileStorage`]: a JSON file on disk, so a CLI can stay signed in
//!   across runs.

mod error;
mod file;
mod memory;

pub use error::StorageError;
pub use file::{DEFAULT_FILE_NAME, FileStorage};
pub use memory::MemoryStorage;

use warden_protocol::PersistedSession;

/// A single slot holding the persisted session.
///
/// `Send + Sync + 'static` because the store's persistence task owns it
/// behind an `Arc` for the lifetime of the store.
#[async_trait::async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Replaces the stored blob.
    async fn persist(&self, session: &PersistedSession) -> Result<(), StorageError>;

    /// Reads the stored blob. A backend that was never written to returns
    /// [`PersistedSession::empty`], not an error.
    async fn restore(&self) -> Result<PersistedSession, StorageError>;
}
