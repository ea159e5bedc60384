//! Transformed artifacts
//!
//! An [`Artifact`] is the output of one transformation: the primary payload
//! (transformed text) plus an optional side artifact (serialized source map).

use std::sync::Arc;

/// Suffix that turns a request path into its side-artifact path.
pub const SIDE_ARTIFACT_SUFFIX: &str = ".map";

/// Transformed output for one source at one fingerprint
///
/// # Invariants
/// - Immutable after construction
/// - Cheap to clone (payloads are `Arc<str>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    code: Arc<str>,
    map: Option<Arc<str>>,
}

impl Artifact {
    /// Create artifact with a primary payload and no side artifact
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<Arc<str>>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    /// Attach a serialized source map
    #[inline]
    #[must_use]
    pub fn with_map(mut self, map: impl Into<Arc<str>>) -> Self {
        self.map = Some(map.into());
        self
    }

    /// Primary payload
    #[inline]
    #[must_use]
    pub fn code(&self) -> &Arc<str> {
        &self.code
    }

    /// Side artifact, if the engine produced one
    #[inline]
    #[must_use]
    pub fn map(&self) -> Option<&Arc<str>> {
        self.map.as_ref()
    }

    /// Append a trailing `sourceMappingURL` comment naming `map_file_name`.
    ///
    /// The side artifact itself is kept as-is.
    #[must_use]
    pub fn with_source_mapping_url(self, map_file_name: &str) -> Self {
        let code = format!("{}\n//# sourceMappingURL={map_file_name}", self.code);
        Self {
            code: code.into(),
            map: self.map,
        }
    }
}

/// Side-artifact request path for a primary request path (`/a.js` → `/a.js.map`).
#[inline]
#[must_use]
pub fn side_artifact_path(request_path: &str) -> String {
    format!("{request_path}{SIDE_ARTIFACT_SUFFIX}")
}

/// Whether `request_path` addresses a side artifact.
#[inline]
#[must_use]
pub fn is_side_artifact_path(request_path: &str) -> bool {
    request_path.ends_with(SIDE_ARTIFACT_SUFFIX)
}
