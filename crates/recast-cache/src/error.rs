//! Error types for artifact storage

use std::path::PathBuf;

/// Errors during artifact storage
///
/// Never surfaced to clients: the cache manager recovers from every
/// variant by invalidating the affected index entry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error on the cache directory or an artifact file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
