//! Photo asset storage.
//!
//! Keeps at most one physical image file per account consistent with
//! the account row's photo key. The store itself is stateless: callers
//! pass the currently persisted key and receive the outcome to persist.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::config::Config;
use crate::domain::PhotoUpload;
use crate::errors::{AppError, AppResult};

/// Result of an attach attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// No previous photo existed; the file was written under `key`
    Stored(String),
    /// The derived key matched the existing one; the file was overwritten
    /// in place and the persisted key stays the same
    Replaced(String),
    /// The account already has a photo under a different key. The incoming
    /// file was discarded and the existing key kept. A warning signal for
    /// the caller, not an error.
    RejectedConflict { existing: String },
}

impl AttachOutcome {
    /// The key the caller should persist, if the attach stored anything.
    pub fn stored_key(&self) -> Option<&str> {
        match self {
            AttachOutcome::Stored(key) | AttachOutcome::Replaced(key) => Some(key),
            AttachOutcome::RejectedConflict { .. } => None,
        }
    }
}

/// Photo store trait for dependency injection.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Run the attach protocol for an upload against the account's
    /// currently persisted key.
    async fn attach(&self, current: Option<&str>, upload: &PhotoUpload)
        -> AppResult<AttachOutcome>;

    /// Delete the file under `key`. Idempotent: a missing file is not
    /// an error.
    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Check whether a file exists under `key`.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Filesystem-backed photo store rooted at the configured upload directory.
pub struct FsPhotoStore {
    root: PathBuf,
}

impl FsPhotoStore {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.upload_dir.clone(),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Validate the upload and return its storage key.
    fn key_for(upload: &PhotoUpload) -> AppResult<String> {
        if !upload.is_valid_image() {
            return Err(AppError::validation(format!(
                "'{}' is not an accepted image file",
                upload.name
            )));
        }
        Ok(upload.derived_key())
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> AppResult<()> {
        fs::create_dir_all(&self.root).await?;
        fs::write(path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn attach(
        &self,
        current: Option<&str>,
        upload: &PhotoUpload,
    ) -> AppResult<AttachOutcome> {
        let key = Self::key_for(upload)?;

        match current {
            None => {
                self.write(&self.path_for(&key), &upload.bytes).await?;
                tracing::debug!(key = %key, "photo stored");
                Ok(AttachOutcome::Stored(key))
            }
            Some(existing) if existing == key => {
                // Same key, same physical location: overwrite in place.
                self.write(&self.path_for(&key), &upload.bytes).await?;
                tracing::debug!(key = %key, "photo overwritten in place");
                Ok(AttachOutcome::Replaced(key))
            }
            Some(existing) => {
                // Conflict policy: never clobber an existing asset by
                // accident. The incoming file is not written at all.
                Ok(AttachOutcome::RejectedConflict {
                    existing: existing.to_string(),
                })
            }
        }
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => {
                tracing::debug!(key = %key, "photo removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        match fs::metadata(self.path_for(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
