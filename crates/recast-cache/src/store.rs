//! Artifact store abstraction
//!
//! [`ArtifactStore`] is the capability set shared by the in-memory and
//! on-disk backends: put, get, evict, all keyed by [`Fingerprint`].

use crate::error::StoreResult;
use async_trait::async_trait;
use recast_artifact::{Artifact, Fingerprint};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

/// Which storage strategy a backend implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Ephemeral, process-lifetime storage
    Memory,
    /// Durable storage in a cache directory
    Disk,
}

impl BackendKind {
    /// Whether artifacts outlive the process
    #[inline]
    #[must_use]
    pub const fn is_durable(self) -> bool {
        matches!(self, Self::Disk)
    }
}

/// A stored primary payload, as handed back by [`ArtifactStore::get`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredArtifact {
    /// Payload held in memory
    Inline(Arc<str>),
    /// Payload persisted at this path; the caller streams it
    File(PathBuf),
}

/// Storage backend for transformed artifacts
///
/// Only the primary payload is stored here. Side artifacts live in the
/// [`SideArtifactRegistry`](crate::SideArtifactRegistry).
#[async_trait]
pub trait ArtifactStore: Debug + Send + Sync + 'static {
    /// Backend strategy
    fn kind(&self) -> BackendKind;

    /// Store the primary payload of `artifact` under `fingerprint`
    ///
    /// # Errors
    /// Returns error if the payload could not be persisted
    async fn put(&self, fingerprint: Fingerprint, artifact: &Artifact) -> StoreResult<()>;

    /// Look up the payload stored under `fingerprint`
    async fn get(&self, fingerprint: &Fingerprint) -> Option<StoredArtifact>;

    /// Check presence without materializing the payload
    async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.get(fingerprint).await.is_some()
    }

    /// Drop whatever is stored under `fingerprint`; absence is not an error
    async fn evict(&self, fingerprint: &Fingerprint);

    /// Apply deferred maintenance (size-bound evictions, counts)
    async fn sync(&self) {}

    /// Number of stored payloads, when the backend tracks it
    fn entry_count(&self) -> Option<u64> {
        None
    }
}
