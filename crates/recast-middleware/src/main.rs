//! recast server binary

use anyhow::Context;
use clap::Parser;
use recast_middleware::logging::init_tracing;
use recast_middleware::{serve, Cli, CommandTransformer, Interceptor};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve().context("loading configuration")?;
    init_tracing(config.debug, config.json_logs);

    let transformer = CommandTransformer::from_config(&config.transform)
        .context("configuring transform command")?;
    let interceptor = Interceptor::new(&config, Arc::new(transformer))
        .context("initializing interceptor")?;

    serve(Arc::new(interceptor), config.server.listen, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
