//! Ready-made [`SyncPersistence`] implementations.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::contract::SyncPersistence;
use crate::resource::{Asset, Entry};

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersistence;

impl SyncPersistence for NoopPersistence {
    fn on_asset_upserted(&self, _asset: &Asset) {}
    fn on_asset_deleted(&self, _id: &str) {}
    fn on_entry_upserted(&self, _entry: &Entry) {}
    fn on_entry_deleted(&self, _id: &str) {}
    fn on_sync_token_advanced(&self, _token: &str) {}
}

/// Keeps the latest sync token in a file so a later process can resume.
///
/// Writes go through a temporary file in the same directory and are renamed into place,
/// so a crash never leaves a truncated token behind.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored token, or `None` if nothing has been stored yet.
    pub fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn store(&self, token: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(token.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl SyncPersistence for TokenFile {
    fn on_asset_upserted(&self, _asset: &Asset) {}
    fn on_asset_deleted(&self, _id: &str) {}
    fn on_entry_upserted(&self, _entry: &Entry) {}
    fn on_entry_deleted(&self, _id: &str) {}

    fn on_sync_token_advanced(&self, token: &str) {
        match self.store(token) {
            Ok(()) => debug!(path = %self.path.display(), "Stored sync token"),
            Err(e) => error!(error = ?e, path = %self.path.display(), "Failed to store sync token"),
        }
    }
}
