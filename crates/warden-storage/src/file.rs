//! JSON file storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use warden_protocol::PersistedSession;

use crate::{Storage, StorageError};

/// File name used by [`FileStorage::in_dir`].
pub const DEFAULT_FILE_NAME: &str = "warden-session.json";

/// Persists the session as a JSON document at a fixed path.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous session intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `dir/warden-session.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl Storage for FileStorage {
    async fn persist(&self, session: &PersistedSession) -> Result<(), StorageError> {
        let bytes = session.to_json().map_err(StorageError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    async fn restore(&self) -> Result<PersistedSession, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no session file");
                return Ok(PersistedSession::empty());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(PersistedSession::empty());
        }

        PersistedSession::from_json(&bytes).map_err(StorageError::Corrupt)
    }
}
