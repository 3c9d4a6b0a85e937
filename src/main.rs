//! Process entry point: install tracing, load configuration, build the
//! orchestrator, and serve the HTTP surface.

use std::sync::Arc;

use citescrape_service::config::ServiceConfig;
use citescrape_service::http::build_router;
use citescrape_service::orchestrator::Orchestrator;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env();
    tracing::info!(
        port = config.port,
        max_concurrency = config.max_concurrency,
        browser_max_requests = config.browser_max_requests,
        "starting citescrape_service"
    );

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let config = Arc::new(config);
    let orchestrator = Arc::new(Orchestrator::new((*config).clone()));

    let app = build_router(orchestrator, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
