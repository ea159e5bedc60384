//! Side-artifact registry (source maps)
//!
//! Keyed by request path plus suffix, e.g. `/lib/a.js.map`, not by
//! fingerprint: an entry is replaced when its owning source is next
//! recomputed. Process lifetime only, never persisted.

use dashmap::DashMap;
use std::sync::Arc;

/// Request-path-keyed store of serialized side artifacts
#[derive(Debug, Default)]
pub struct SideArtifactRegistry {
    entries: DashMap<String, Arc<str>>,
}

impl SideArtifactRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `content` under `map_path`, replacing any previous entry
    pub fn insert(&self, map_path: impl Into<String>, content: Arc<str>) {
        self.entries.insert(map_path.into(), content);
    }

    /// Content registered under `map_path`
    #[must_use]
    pub fn get(&self, map_path: &str) -> Option<Arc<str>> {
        self.entries.get(map_path).map(|entry| entry.value().clone())
    }

    /// Number of registered side artifacts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
