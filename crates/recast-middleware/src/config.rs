//! Configuration
//!
//! [`RecastConfig`] is read from TOML and then overridden from the command
//! line. Every field has a default except `src_path`.
//!
//! ```toml
//! src_path = "public"
//! cache_path = "memory"        # or a directory, e.g. ".recast-cache"
//! exclude = ["vendor/**", "*.min.js"]
//! debug = false
//! console_errors = true
//!
//! [transform]
//! command = ["babel", "{input}"]
//! output = "text"
//!
//! [transform.options]
//! presets = ["env"]
//!
//! [server]
//! listen = "127.0.0.1:3000"
//! ```

use crate::error::ConfigError;
use crate::presenter::ErrorMode;
use crate::transform::TransformOptions;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Value of `cache_path` selecting the in-memory backend
pub const MEMORY_CACHE: &str = "memory";

/// Where artifacts are stored
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CacheMode {
    /// In-process, lost on exit
    #[default]
    Memory,
    /// One file per artifact in this directory
    Directory(PathBuf),
}

impl From<String> for CacheMode {
    fn from(value: String) -> Self {
        if value == MEMORY_CACHE {
            Self::Memory
        } else {
            Self::Directory(PathBuf::from(value))
        }
    }
}

impl From<&str> for CacheMode {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<CacheMode> for String {
    fn from(mode: CacheMode) -> Self {
        mode.to_string()
    }
}

impl Display for CacheMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str(MEMORY_CACHE),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// How the transformation command reports its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// stdout is the transformed code
    #[default]
    Text,
    /// stdout is `{ "code": "...", "map": ... }`
    Json,
}

/// Transformation engine settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Program and arguments; `{input}` is replaced by the source path
    pub command: Vec<String>,
    /// Output protocol of the command
    pub output: OutputFormat,
    /// Pass-through options, handed to the engine as JSON
    pub options: TransformOptions,
}

/// HTTP adapter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

/// Full recast configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecastConfig {
    /// Source root requests are resolved against
    pub src_path: PathBuf,
    /// `"memory"` or a cache directory
    pub cache_path: CacheMode,
    /// Glob patterns served untransformed
    pub exclude: Vec<String>,
    /// Debug logging
    pub debug: bool,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Report transformation errors as a console script instead of a 500
    pub console_errors: bool,
    /// Extension of cached artifact files
    pub output_extension: String,
    /// Content type of transformed output
    pub content_type: String,
    /// Payload byte bound for the memory cache (unbounded when absent)
    pub memory_capacity: Option<u64>,
    /// Transformation engine
    pub transform: TransformConfig,
    /// HTTP adapter
    pub server: ServerConfig,
}

impl Default for RecastConfig {
    fn default() -> Self {
        Self {
            src_path: PathBuf::new(),
            cache_path: CacheMode::Memory,
            exclude: Vec::new(),
            debug: false,
            json_logs: false,
            console_errors: false,
            output_extension: ".js".to_string(),
            content_type: "application/javascript; charset=utf-8".to_string(),
            memory_capacity: None,
            transform: TransformConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl RecastConfig {
    /// Create configuration serving `src_path` with defaults elsewhere
    #[inline]
    #[must_use]
    pub fn new(src_path: impl Into<PathBuf>) -> Self {
        Self {
            src_path: src_path.into(),
            ..Self::default()
        }
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this schema
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&text, path)
    }

    /// Check settings that have no usable default
    ///
    /// # Errors
    /// Returns error if no source root is configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.src_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingSourceRoot);
        }
        Ok(())
    }

    /// Error presentation mode
    #[inline]
    #[must_use]
    pub fn error_mode(&self) -> ErrorMode {
        ErrorMode::from_console_errors(self.console_errors)
    }

    /// With cache mode
    #[inline]
    #[must_use]
    pub fn with_cache_path(mut self, cache_path: impl Into<CacheMode>) -> Self {
        self.cache_path = cache_path.into();
        self
    }

    /// With exclusion patterns
    #[inline]
    #[must_use]
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// With console-script error presentation
    #[inline]
    #[must_use]
    pub fn with_console_errors(mut self, enabled: bool) -> Self {
        self.console_errors = enabled;
        self
    }

    /// With debug logging
    #[inline]
    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// With a payload byte bound for the memory cache
    #[inline]
    #[must_use]
    pub fn with_memory_capacity(mut self, max_bytes: u64) -> Self {
        self.memory_capacity = Some(max_bytes);
        self
    }
}
