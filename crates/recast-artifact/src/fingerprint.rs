//! Source fingerprints
//!
//! Provides [`Fingerprint`], a strongly-typed 32-byte identity token for a
//! `(source path, modification time)` pair. It is the only key the cache
//! uses: a changed mtime yields a new fingerprint, which supersedes the
//! artifact stored under the old one.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A 32-byte source fingerprint (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a fingerprint from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fingerprint a source file from its path and last-modification time.
    ///
    /// Never fails and has no side effects.
    #[must_use]
    pub fn of(path: &Path, mtime: SystemTime) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(mtime_nanos(mtime).to_string().as_bytes());
        hasher.update(b"-");
        hasher.update(path.as_os_str().as_encoded_bytes());
        Self::new(*hasher.finalize().as_bytes())
    }

    /// Short string representation (first 16 hex chars), for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// File name used by on-disk stores: full hex plus `extension`.
    ///
    /// `extension` is appended verbatim, so it should carry its leading dot.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{self}{extension}")
    }
}

/// Signed nanoseconds relative to the UNIX epoch.
fn mtime_nanos(mtime: SystemTime) -> i128 {
    match mtime.duration_since(UNIX_EPOCH) {
        Ok(after) => i128::try_from(after.as_nanos()).unwrap_or(i128::MAX),
        Err(before) => -i128::try_from(before.duration().as_nanos()).unwrap_or(i128::MAX),
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| FingerprintError::InvalidLength { expected: 32, actual })?;
        Ok(Self(bytes))
    }
}

/// Errors that can occur when parsing fingerprints
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Invalid fingerprint length
    #[error("invalid fingerprint length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
