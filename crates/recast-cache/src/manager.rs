//! Cache manager
//!
//! Owns the fingerprint index, the artifact store, the side-artifact
//! registry and the background disk writes of one interceptor. Constructed
//! at startup; [`CacheManager::flush`] drains outstanding writes before
//! shutdown.

use crate::disk::DiskStore;
use crate::index::FingerprintIndex;
use crate::memory::MemoryStore;
use crate::side::SideArtifactRegistry;
use crate::store::{ArtifactStore, BackendKind, StoredArtifact};
use recast_artifact::{side_artifact_path, Artifact, Fingerprint};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Outcome of a cache lookup for one `(source, fingerprint)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Index and store agree on the current fingerprint
    Hit(StoredArtifact),
    /// Recompute needed; `stale` is a superseded fingerprint to evict
    Miss { stale: Option<Fingerprint> },
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Storage strategy in use
    pub backend: BackendKind,
    /// Sources with a last-known fingerprint
    pub indexed_sources: usize,
    /// Registered side artifacts
    pub side_artifacts: usize,
    /// Stored payloads, when the backend tracks it
    pub stored_artifacts: Option<u64>,
}

/// Fingerprint-keyed artifact cache
#[derive(Debug)]
pub struct CacheManager {
    index: Arc<FingerprintIndex>,
    store: Arc<dyn ArtifactStore>,
    side_artifacts: SideArtifactRegistry,
    writes: TaskTracker,
}

impl CacheManager {
    /// Create manager over an arbitrary store
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            index: Arc::new(FingerprintIndex::new()),
            store,
            side_artifacts: SideArtifactRegistry::new(),
            writes: TaskTracker::new(),
        }
    }

    /// Unbounded in-memory cache
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::unbounded()))
    }

    /// On-disk cache rooted at `root`
    #[must_use]
    pub fn on_disk(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self::new(Arc::new(DiskStore::open(root, extension)))
    }

    /// Fingerprint index
    #[inline]
    #[must_use]
    pub fn index(&self) -> &FingerprintIndex {
        &self.index
    }

    /// Artifact store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Serialized side artifact registered under `map_path`
    #[must_use]
    pub fn side_artifact(&self, map_path: &str) -> Option<Arc<str>> {
        self.side_artifacts.get(map_path)
    }

    /// Decide between serving a stored artifact and recomputing.
    ///
    /// Durable backends first adopt an artifact already on disk for
    /// `fingerprint`, which keeps a warm cache directory usable across
    /// restarts.
    pub async fn lookup(&self, source: &Path, fingerprint: Fingerprint) -> Lookup {
        if self.store.kind().is_durable() && self.store.contains(&fingerprint).await {
            self.index.set(source, fingerprint);
        }

        let last_known = self.index.observe(source);
        if last_known == Some(fingerprint) {
            if let Some(stored) = self.store.get(&fingerprint).await {
                return Lookup::Hit(stored);
            }
        }

        Lookup::Miss {
            stale: last_known.filter(|known| *known != fingerprint),
        }
    }

    /// Evict the artifact stored under a superseded fingerprint.
    ///
    /// The index entry for `source` is dropped first, so a background write
    /// of `stale` that lands afterwards removes its own file.
    pub async fn invalidate(&self, source: &Path, stale: &Fingerprint) {
        tracing::debug!("Evicting stale artifact {}", stale.short());
        self.index.clear_if(source, stale);
        self.store.evict(stale).await;
    }

    /// Forget the last-known fingerprint for `source`
    pub fn forget(&self, source: &Path) {
        self.index.clear(source);
    }

    /// Record a freshly computed artifact and return the payload to serve.
    ///
    /// A side artifact is registered under `request_path` plus the map
    /// suffix, and the payload gains a trailing reference to it. Memory
    /// stores are written before returning; disk writes run in the
    /// background, and a failed write clears the index entry so the next
    /// request retries it. A write that completes after `source` has moved
    /// on to another fingerprint is unlinked again.
    pub async fn commit(
        &self,
        source: &Path,
        request_path: &str,
        fingerprint: Fingerprint,
        artifact: Artifact,
    ) -> Arc<str> {
        self.index.set(source, fingerprint);

        let artifact = match artifact.map().cloned() {
            Some(map) => {
                let map_path = side_artifact_path(request_path);
                let map_file_name = side_artifact_path(file_name(request_path));
                self.side_artifacts.insert(map_path, map);
                artifact.with_source_mapping_url(&map_file_name)
            }
            None => artifact,
        };
        let code = artifact.code().clone();

        if self.store.kind().is_durable() {
            let store = Arc::clone(&self.store);
            let index = Arc::clone(&self.index);
            let source = source.to_path_buf();
            self.writes.spawn(async move {
                if let Err(e) = store.put(fingerprint, &artifact).await {
                    tracing::warn!("Error saving {}: {}", fingerprint.short(), e);
                    index.clear_if(&source, &fingerprint);
                } else if index.observe(&source) != Some(fingerprint) {
                    tracing::debug!("Discarding superseded artifact {}", fingerprint.short());
                    store.evict(&fingerprint).await;
                }
            });
        } else if let Err(e) = self.store.put(fingerprint, &artifact).await {
            tracing::warn!("Error caching {}: {}", fingerprint.short(), e);
            self.index.clear_if(source, &fingerprint);
        }

        code
    }

    /// Wait for every background write started so far, then let the store
    /// settle pending evictions
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
        self.store.sync().await;
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            backend: self.store.kind(),
            indexed_sources: self.index.len(),
            side_artifacts: self.side_artifacts.len(),
            stored_artifacts: self.store.entry_count(),
        }
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Last segment of a request path.
fn file_name(request_path: &str) -> &str {
    request_path.rsplit('/').next().unwrap_or(request_path)
}
