//! In-memory artifact store using moka
//!
//! Lifetime is the owning [`CacheManager`](crate::CacheManager)'s lifetime.
//! Unbounded by default: entries leave only through supersede-eviction.
//! [`MemoryStore::bounded`] opts into size-bounded eviction instead.

use crate::error::StoreResult;
use crate::store::{ArtifactStore, BackendKind, StoredArtifact};
use async_trait::async_trait;
use moka::future::Cache;
use recast_artifact::{Artifact, Fingerprint};
use std::sync::Arc;

/// Fingerprint-keyed in-process payload store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Cache<Fingerprint, Arc<str>>,
}

impl MemoryStore {
    /// Create an unbounded store
    #[inline]
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    /// Create a store holding at most `max_bytes` of payload
    ///
    /// Least valuable entries are evicted once the bound is exceeded; an
    /// evicted entry shows up as a cache miss and is recomputed.
    #[inline]
    #[must_use]
    pub fn bounded(max_bytes: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_bytes)
                .weigher(|_fingerprint, code: &Arc<str>| {
                    u32::try_from(code.len()).unwrap_or(u32::MAX)
                })
                .build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn put(&self, fingerprint: Fingerprint, artifact: &Artifact) -> StoreResult<()> {
        self.inner.insert(fingerprint, artifact.code().clone()).await;
        Ok(())
    }

    async fn get(&self, fingerprint: &Fingerprint) -> Option<StoredArtifact> {
        self.inner.get(fingerprint).await.map(StoredArtifact::Inline)
    }

    async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.contains_key(fingerprint)
    }

    async fn evict(&self, fingerprint: &Fingerprint) {
        self.inner.invalidate(fingerprint).await;
    }

    async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    fn entry_count(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }
}
