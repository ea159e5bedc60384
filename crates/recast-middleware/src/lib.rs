//! recast Middleware
//!
//! Request-time transformation with fingerprint caching:
//! - Resolves request paths under a source root
//! - Serves excluded paths untouched
//! - Transforms on a cache miss, serves stored artifacts on a hit
//! - Presents transformation failures to the client
//!
//! # Example
//!
//! ```rust,ignore
//! use recast_middleware::{CommandTransformer, Interceptor, RecastConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RecastConfig::load("recast.toml".as_ref())?;
//! let transformer = CommandTransformer::from_config(&config.transform)?;
//! let interceptor = Arc::new(Interceptor::new(&config, Arc::new(transformer))?);
//!
//! if let Some(reply) = interceptor.handle("/app.js").await.into_reply() {
//!     println!("{}", reply.status());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod exclude;
pub mod interceptor;
pub mod logging;
pub mod presenter;
pub mod reply;
pub mod server;
pub mod transform;

pub use cli::Cli;
pub use config::{CacheMode, OutputFormat, RecastConfig, ServerConfig, TransformConfig};
pub use error::{ConfigError, ServerError};
pub use exclude::ExcludeRules;
pub use interceptor::Interceptor;
pub use presenter::{ErrorMode, ErrorPresenter};
pub use reply::{
    Outcome, Reply, ReplyBody, CACHE_HASH_HEADER, CACHE_HEADER, CACHE_HIT_HEADER,
};
pub use server::{respond, serve, serve_listener};
pub use transform::{
    CommandTransformer, TransformError, TransformOptions, TransformOutput, Transformer,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
