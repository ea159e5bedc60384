//! Request interceptor
//!
//! The per-request decision procedure. For each request path, in order:
//!
//! 1. side-artifact (`.map`) requests are answered from the registry or
//!    delegated
//! 2. the path is resolved under the source root; anything that is not a
//!    regular file is delegated
//! 3. excluded paths are streamed untransformed
//! 4. the source is fingerprinted from its path and mtime
//! 5. a stored artifact for that fingerprint is served
//! 6. otherwise the superseded artifact is evicted,
//! 7. the source is transformed (failures go to the error presenter),
//! 8. the result is stored, and
//! 9. served.
//!
//! Concurrent requests for the same source are not serialized: both may
//! transform and store. Last write wins and both responses are correct.

use crate::config::{CacheMode, RecastConfig};
use crate::error::ConfigError;
use crate::exclude::ExcludeRules;
use crate::presenter::ErrorPresenter;
use crate::reply::{
    content_type_for, flag, Outcome, Reply, CACHE_HASH_HEADER, CACHE_HEADER, CACHE_HIT_HEADER,
    SOURCE_MAP_CONTENT_TYPE,
};
use crate::transform::{TransformError, TransformOptions, TransformOutput, Transformer};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, StatusCode};
use recast_artifact::{is_side_artifact_path, Fingerprint};
use recast_cache::{CacheManager, DiskStore, Lookup, MemoryStore, StoredArtifact};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Fingerprint-caching request interceptor
pub struct Interceptor {
    src_root: PathBuf,
    exclude: ExcludeRules,
    cache: CacheManager,
    transformer: Arc<dyn Transformer>,
    options: Arc<TransformOptions>,
    presenter: ErrorPresenter,
    content_type: HeaderValue,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("src_root", &self.src_root)
            .field("exclude", &self.exclude.patterns())
            .field("cache", &self.cache)
            .field("presenter", &self.presenter)
            .finish_non_exhaustive()
    }
}

impl Interceptor {
    /// Build an interceptor and its cache from `config`
    ///
    /// The source root is resolved to an absolute path, so it must exist.
    ///
    /// # Errors
    /// Returns error if the configuration is incomplete or invalid
    pub fn new(config: &RecastConfig, transformer: Arc<dyn Transformer>) -> Result<Self, ConfigError> {
        config.validate()?;

        let src_root = std::fs::canonicalize(&config.src_path)
            .map_err(|e| ConfigError::io_error(&config.src_path, e))?;
        let exclude = ExcludeRules::new(&config.exclude)?;
        let content_type = HeaderValue::from_str(&config.content_type)
            .map_err(|_| ConfigError::InvalidContentType(config.content_type.clone()))?;

        let cache = match &config.cache_path {
            CacheMode::Memory => match config.memory_capacity {
                Some(max_bytes) => CacheManager::new(Arc::new(MemoryStore::bounded(max_bytes))),
                None => CacheManager::in_memory(),
            },
            CacheMode::Directory(dir) => CacheManager::new(Arc::new(DiskStore::open(
                dir.clone(),
                config.output_extension.clone(),
            ))),
        };

        tracing::info!(
            "Serving {} (cache: {}, excludes: {})",
            src_root.display(),
            config.cache_path,
            exclude.patterns().len()
        );

        Ok(Self {
            src_root,
            exclude,
            cache,
            transformer,
            options: Arc::new(config.transform.options.clone()),
            presenter: ErrorPresenter::new(config.error_mode()),
            content_type,
        })
    }

    /// Absolute source root
    #[inline]
    #[must_use]
    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    /// Cache owned by this interceptor
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Decide how to answer `request_path`
    pub async fn handle(&self, request_path: &str) -> Outcome {
        if is_side_artifact_path(request_path) {
            return self.serve_side_artifact(request_path);
        }

        let Some(source) = self.resolve(request_path) else {
            return Outcome::Next;
        };
        let metadata = match tokio::fs::symlink_metadata(&source).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Outcome::Next,
        };

        if self.exclude.is_match(request_path) {
            tracing::debug!("Excluded: {} ({:?})", request_path, self.exclude.patterns());
            let mut headers = HeaderMap::new();
            headers.insert(CACHE_HEADER, flag(false));
            let content_type = content_type_for(&source);
            return self.stream_file(&source, headers, content_type).await;
        }

        let mtime = match metadata.modified() {
            Ok(mtime) => mtime,
            Err(e) => {
                return Outcome::Respond(
                    self.presenter.present(&TransformError::io(&source, &e), HeaderMap::new()),
                )
            }
        };
        let fingerprint = Fingerprint::of(&source, mtime);
        tracing::debug!("Preparing: {} ({})", source.display(), fingerprint.short());

        let mut headers = HeaderMap::new();
        headers.insert(CACHE_HEADER, flag(true));
        if let Ok(value) = HeaderValue::from_str(&fingerprint.to_string()) {
            headers.insert(CACHE_HASH_HEADER, value);
        }

        match self.cache.lookup(&source, fingerprint).await {
            Lookup::Hit(stored) => {
                headers.insert(CACHE_HIT_HEADER, flag(true));
                return self.serve_stored(&source, stored, headers).await;
            }
            Lookup::Miss { stale } => {
                headers.insert(CACHE_HIT_HEADER, flag(false));
                if let Some(stale) = stale {
                    self.cache.invalidate(&source, &stale).await;
                }
            }
        }

        let output = match self.transform(&source).await {
            Ok(output) => output,
            Err(error) => {
                tracing::debug!("Transformation failed: {}: {}", source.display(), error);
                self.cache.forget(&source);
                return Outcome::Respond(self.presenter.present(&error, headers));
            }
        };

        let code = self
            .cache
            .commit(&source, request_path, fingerprint, output.into())
            .await;
        tracing::debug!("Serving (uncached): {}", source.display());
        Outcome::Respond(
            Reply::text(StatusCode::OK, headers, code).with_content_type(self.content_type.clone()),
        )
    }

    /// Map a request path to a file under the source root.
    ///
    /// Paths that would leave the root do not resolve.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut resolved = self.src_root.clone();
        for component in Path::new(request_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }

    fn serve_side_artifact(&self, request_path: &str) -> Outcome {
        match self.cache.side_artifact(request_path) {
            Some(map) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(SOURCE_MAP_CONTENT_TYPE));
                headers.insert(CACHE_HEADER, flag(true));
                Outcome::Respond(Reply::text(StatusCode::OK, headers, map))
            }
            None => Outcome::Next,
        }
    }

    async fn serve_stored(&self, source: &Path, stored: StoredArtifact, headers: HeaderMap) -> Outcome {
        match stored {
            StoredArtifact::Inline(code) => {
                tracing::debug!("Serving (cached): {}", source.display());
                Outcome::Respond(
                    Reply::text(StatusCode::OK, headers, code)
                        .with_content_type(self.content_type.clone()),
                )
            }
            StoredArtifact::File(path) => {
                tracing::debug!("Serving (cached): {}", path.display());
                self.stream_file(&path, headers, self.content_type.clone())
                    .await
            }
        }
    }

    async fn stream_file(&self, path: &Path, headers: HeaderMap, content_type: HeaderValue) -> Outcome {
        match tokio::fs::File::open(path).await {
            Ok(file) => Outcome::Respond(Reply::file(headers, file).with_content_type(content_type)),
            Err(e) => Outcome::Respond(self.presenter.present(&TransformError::io(path, &e), headers)),
        }
    }

    async fn transform(&self, source: &Path) -> Result<TransformOutput, TransformError> {
        let transformer = Arc::clone(&self.transformer);
        let options = Arc::clone(&self.options);
        let source = source.to_path_buf();
        tokio::task::spawn_blocking(move || transformer.transform(&source, &options))
            .await
            .unwrap_or_else(|e| Err(TransformError::new(format!("transformation task failed: {e}"))))
    }
}
