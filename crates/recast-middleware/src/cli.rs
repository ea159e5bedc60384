//! Command line interface
//!
//! Flags override values from the `--config` file.

use crate::config::{CacheMode, OutputFormat, RecastConfig};
use crate::error::ConfigError;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Serve a source tree through a cached transformation command.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "recast", version, about = "Request-time transformation cache")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Source root requests are resolved against.
    #[arg(short, long)]
    pub src: Option<PathBuf>,

    /// `memory` or a cache directory.
    #[arg(long)]
    pub cache: Option<String>,

    /// Glob pattern served untransformed (repeatable).
    #[arg(short, long = "exclude")]
    pub exclude: Vec<String>,

    /// Listen address.
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,

    /// Emit log lines as JSON.
    #[arg(long)]
    pub json_logs: bool,

    /// Report transformation errors to the browser console.
    #[arg(long)]
    pub console_errors: bool,

    /// Payload byte bound for the memory cache.
    #[arg(long)]
    pub memory_capacity: Option<u64>,

    /// The command prints `{"code": ..., "map": ...}` instead of plain code.
    #[arg(long)]
    pub json_output: bool,

    /// Transformation command; `{input}` is replaced by the source path.
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// Load the config file, if any, and apply the flags on top
    ///
    /// # Errors
    /// Returns error if the config file cannot be read or parsed
    pub fn resolve(&self) -> Result<RecastConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => RecastConfig::load(path)?,
            None => RecastConfig::default(),
        };
        Ok(self.apply(config))
    }

    /// Override `config` with the flags that were given
    #[must_use]
    pub fn apply(&self, mut config: RecastConfig) -> RecastConfig {
        if let Some(src) = &self.src {
            config.src_path.clone_from(src);
        }
        if let Some(cache) = &self.cache {
            config.cache_path = CacheMode::from(cache.as_str());
        }
        if !self.exclude.is_empty() {
            config.exclude.clone_from(&self.exclude);
        }
        if let Some(listen) = self.listen {
            config.server.listen = listen;
        }
        if let Some(max_bytes) = self.memory_capacity {
            config.memory_capacity = Some(max_bytes);
        }
        if !self.command.is_empty() {
            config.transform.command.clone_from(&self.command);
        }
        if self.json_output {
            config.transform.output = OutputFormat::Json;
        }
        config.debug |= self.debug;
        config.json_logs |= self.json_logs;
        config.console_errors |= self.console_errors;
        config
    }
}
