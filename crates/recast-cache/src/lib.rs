//! recast Cache
//!
//! Change detection and storage for transformed artifacts.
//!
//! # Architecture
//!
//! ```text
//! (path, mtime) → Fingerprint ─┐
//!                              ▼
//!   CacheManager ── FingerprintIndex (path → last-known fingerprint)
//!        │
//!        ├── ArtifactStore (fingerprint → payload)
//!        │      ├─ MemoryStore (moka)
//!        │      └─ DiskStore   (one file per fingerprint)
//!        │
//!        └── SideArtifactRegistry (request path + ".map" → source map)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_cache::{CacheManager, Lookup};
//!
//! let cache = CacheManager::in_memory();
//! match cache.lookup(&source, fingerprint).await {
//!     Lookup::Hit(stored) => serve(stored),
//!     Lookup::Miss { stale } => {
//!         if let Some(stale) = stale {
//!             cache.invalidate(&source, &stale).await;
//!         }
//!         let code = cache.commit(&source, "/a.js", fingerprint, artifact).await;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod disk;
pub mod error;
pub mod index;
pub mod manager;
pub mod memory;
pub mod side;
pub mod store;

pub use disk::DiskStore;
pub use error::{StoreError, StoreResult};
pub use index::FingerprintIndex;
pub use manager::{CacheManager, CacheStats, Lookup};
pub use memory::MemoryStore;
pub use side::SideArtifactRegistry;
pub use store::{ArtifactStore, BackendKind, StoredArtifact};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
