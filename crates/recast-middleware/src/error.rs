//! Error types for the middleware
//!
//! - Configuration errors (startup only)
//! - Server errors (bind / serve)
//!
//! Transformation failures are [`TransformError`](crate::TransformError) and
//! never escape the interceptor: they are rendered by the error presenter.

use std::path::PathBuf;

/// Errors while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a config file or resolving a directory
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No source root configured
    #[error("no source root configured (set `src_path` or pass --src)")]
    MissingSourceRoot,

    /// Exclusion pattern does not compile
    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Transformation command is empty
    #[error("no transform command configured")]
    EmptyCommand,

    /// Configured content type is not a valid header value
    #[error("invalid content type: {0}")]
    InvalidContentType(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors running the HTTP adapter
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Could not bind the listen address
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server failed while running
    #[error("server error: {0}")]
    Serve(#[from] hyper::Error),
}
