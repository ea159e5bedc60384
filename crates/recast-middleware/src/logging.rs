//! Tracing setup for the binary

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `debug` or `info`
#[must_use]
pub fn env_filter(debug: bool) -> EnvFilter {
    let level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber.
///
/// Calling this more than once keeps the first subscriber.
pub fn init_tracing(debug: bool, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
