//! recast Artifact Primitives
//!
//! Identity and payload types shared by the cache and the interceptor.
//!
//! # Core Concepts
//!
//! - [`Fingerprint`]: 32-byte Blake3 token for a `(path, mtime)` pair
//! - [`Artifact`]: transformed output plus optional source map
//!
//! # Example
//!
//! ```rust
//! use recast_artifact::{Artifact, Fingerprint};
//! use std::path::Path;
//! use std::time::SystemTime;
//!
//! let fp = Fingerprint::of(Path::new("/src/a.js"), SystemTime::UNIX_EPOCH);
//! let artifact = Artifact::new("let x = 1;");
//! println!("{} -> {} bytes", fp.short(), artifact.code().len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod fingerprint;

pub use artifact::{is_side_artifact_path, side_artifact_path, Artifact, SIDE_ARTIFACT_SUFFIX};
pub use fingerprint::{Fingerprint, FingerprintError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
