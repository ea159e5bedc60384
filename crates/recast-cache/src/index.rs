//! Source path → last-known fingerprint bookkeeping

use dashmap::DashMap;
use recast_artifact::Fingerprint;
use std::path::{Path, PathBuf};

/// Fingerprint of the artifact currently stored for each source path
///
/// Pure bookkeeping, no I/O. If an entry `P → F` exists, the store holds
/// (or very recently held) an artifact under `F` for `P`.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    entries: DashMap<PathBuf, Fingerprint>,
}

impl FingerprintIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-known fingerprint for `source`
    #[must_use]
    pub fn observe(&self, source: &Path) -> Option<Fingerprint> {
        self.entries.get(source).map(|entry| *entry)
    }

    /// Record `fingerprint` as current for `source`
    pub fn set(&self, source: &Path, fingerprint: Fingerprint) {
        self.entries.insert(source.to_path_buf(), fingerprint);
    }

    /// Forget `source`
    pub fn clear(&self, source: &Path) {
        self.entries.remove(source);
    }

    /// Forget `source` only while it still maps to `fingerprint`
    ///
    /// Returns whether an entry was removed. A newer fingerprint recorded in
    /// the meantime is left alone.
    pub fn clear_if(&self, source: &Path, fingerprint: &Fingerprint) -> bool {
        self.entries
            .remove_if(source, |_, current| current == fingerprint)
            .is_some()
    }

    /// Number of tracked sources
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no source is tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
