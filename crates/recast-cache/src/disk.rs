//! On-disk artifact store
//!
//! One file per fingerprint, named `<fingerprint-hex><extension>`, flat in
//! the cache directory. There is no manifest: presence of the file is the
//! index. The directory is created on open and re-created whenever it is
//! found missing.

use crate::error::{StoreError, StoreResult};
use crate::store::{ArtifactStore, BackendKind, StoredArtifact};
use async_trait::async_trait;
use recast_artifact::{Artifact, Fingerprint};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Directory-backed payload store
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    extension: String,
    temp_seq: AtomicU64,
}

impl DiskStore {
    /// Open a store rooted at `root`, naming files with `extension`
    /// (e.g. `".js"`).
    ///
    /// Creating the directory is best effort: a failure is logged and
    /// retried before the next write.
    pub fn open(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let root = root.into();
        if let Err(e) = std::fs::create_dir_all(&root) {
            tracing::warn!("Could not create cache directory {}: {}", root.display(), e);
        }
        Self {
            root,
            extension: extension.into(),
            temp_seq: AtomicU64::new(0),
        }
    }

    /// Cache directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the artifact stored under `fingerprint`
    #[inline]
    #[must_use]
    pub fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(fingerprint.file_name(&self.extension))
    }

    /// Re-create the cache directory if it has gone missing
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub async fn ensure_root(&self) -> StoreResult<()> {
        if tokio::fs::metadata(&self.root).await.is_ok() {
            return Ok(());
        }
        tracing::debug!("Re-creating cache directory {}", self.root.display());
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io_error(&self.root, e))
    }

    fn temp_path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            ".{}.{}.tmp",
            fingerprint.file_name(&self.extension),
            seq
        ))
    }
}

#[async_trait]
impl ArtifactStore for DiskStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Disk
    }

    /// Write to a temporary sibling, then rename into place, so a
    /// concurrent reader never observes a partial payload.
    async fn put(&self, fingerprint: Fingerprint, artifact: &Artifact) -> StoreResult<()> {
        self.ensure_root().await?;

        let target = self.path_for(&fingerprint);
        let temp = self.temp_path_for(&fingerprint);

        if let Err(e) = tokio::fs::write(&temp, artifact.code().as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StoreError::io_error(&temp, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StoreError::io_error(&target, e));
        }
        Ok(())
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Option<StoredArtifact> {
        let path = self.path_for(fingerprint);
        if self.contains(fingerprint).await {
            return Some(StoredArtifact::File(path));
        }

        if let Err(e) = self.ensure_root().await {
            tracing::warn!("{}", e);
        }
        None
    }

    async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        tokio::fs::try_exists(self.path_for(fingerprint))
            .await
            .unwrap_or(false)
    }

    async fn evict(&self, fingerprint: &Fingerprint) {
        let path = self.path_for(fingerprint);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Evicted {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not evict {}: {}", path.display(), e),
        }
    }
}
