use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use handoff::config::{Cli, Config};
use handoff::routes;
use handoff::state::AppState;
use handoff::store::{sweeper, TokenStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    // Backend is chosen once here and never swapped
    let store = Arc::new(TokenStore::from_config(&config.durable)?);
    tracing::info!("Token backend: {}", store.backend_kind());

    let sweeper = config.sweep_interval().map(|every| {
        tracing::info!("Expired-token sweep every {}s", every.as_secs());
        sweeper::spawn(store.clone(), every)
    });

    let app = routes::app(AppState::new(store), config.request_timeout());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app).await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    served?;

    Ok(())
}
