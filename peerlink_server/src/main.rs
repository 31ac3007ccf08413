use anyhow::Result;
use peerlink_core::AppConfig;
use peerlink_core::http_share::{AppState, start_http_server};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (PORT etc.)
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::load();
    let addr = SocketAddr::new(config.bind_host, config.http_port);
    tracing::info!("Upload directory: {}", config.upload_dir.display());

    let state = Arc::new(AppState::new(config));
    let shutdown = state.shutdown.clone();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Shutting down server...");
        signal_token.cancel();
    });

    start_http_server(addr, state, shutdown).await?;
    tracing::info!("API server stopped");
    Ok(())
}
