//! Durable artifact writes under the output root.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::layout::{ArtifactKind, RunLayout};

/// Folder (under the output root) that receives uploaded images.
const UPLOAD_DIR: &str = "custom_images";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is outside the allowed directory", path.display())]
    OutsideRoot { path: PathBuf },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Filesystem store rooted at the configured output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self, topic: &str, started_at: DateTime<Utc>) -> RunLayout {
        RunLayout::new(&self.root, topic, started_at)
    }

    /// Write one artifact and flush it to disk before returning its path.
    pub async fn write(
        &self,
        layout: &RunLayout,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&layout.folder)
            .await
            .map_err(|e| StorageError::io(&layout.folder, e))?;

        let path = layout.artifact_path(kind);
        write_synced(&path, bytes).await?;
        debug!("Wrote {} artifact ({} bytes) to {:?}", kind, bytes.len(), path);
        Ok(path)
    }

    /// Store an uploaded image as `custom_images/custom_<epoch>.jpg`.
    pub async fn save_upload(
        &self,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<PathBuf, StorageError> {
        let folder = self.root.join(UPLOAD_DIR);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| StorageError::io(&folder, e))?;

        let path = folder.join(format!("custom_{}.jpg", now.timestamp()));
        write_synced(&path, bytes).await?;
        Ok(path)
    }

    /// Resolve `path` and make sure it lies under the output root.
    pub async fn resolve_within(&self, path: &Path) -> Result<PathBuf, StorageError> {
        resolve_under(&self.root, path).await
    }

    /// Resolve `path` and make sure it is an image saved by [`save_upload`].
    ///
    /// [`save_upload`]: ArtifactStore::save_upload
    pub async fn resolve_upload(&self, path: &Path) -> Result<PathBuf, StorageError> {
        resolve_under(&self.root.join(UPLOAD_DIR), path).await
    }

    /// Read a text artifact that must live under the output root.
    pub async fn read_text_within(&self, path: &Path) -> Result<String, StorageError> {
        let resolved = self.resolve_within(path).await?;
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| StorageError::io(&resolved, e))
    }
}

async fn resolve_under(base: &Path, path: &Path) -> Result<PathBuf, StorageError> {
    let base = tokio::fs::canonicalize(base)
        .await
        .map_err(|e| StorageError::io(base, e))?;
    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    if resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        Err(StorageError::OutsideRoot {
            path: path.to_path_buf(),
        })
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StorageError::io(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| StorageError::io(path, e))
}
