use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use media_range::config::ServerConfig;
use media_range::logging::init_logging;
use media_range::{router, MediaState, S3Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = ServerConfig::parse();

    let store = S3Store::connect(&config.s3()).await;
    let app = router(&config.route, MediaState::new(Arc::new(store)));

    let listener = TcpListener::bind(config.bind).await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %listener.local_addr()?, route = %config.route, "media server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
