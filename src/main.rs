//! Gateway entry point.
//!
//! Loads configuration from the environment, initializes logging and
//! metrics, connects to Postgres, and serves the HTTP API.

use anyhow::Result;
use llm_gateway::api::{build_router, AppState};
use llm_gateway::core::{init_metrics, logging, Database, Settings};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;

    logging::init_logging(&settings.log_level);
    init_metrics();

    tracing::info!(
        environment = %settings.environment,
        provider_timeout_secs = settings.provider_timeout_secs,
        "Starting LLM governance gateway"
    );

    let db = Database::connect(&settings.database_url).await?;
    tracing::info!("Database connected");

    let http_client = create_http_client();
    let port = settings.port;
    let state = Arc::new(AppState::new(settings, db, http_client));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Listening");
    tracing::info!("Chat API: POST /v1/chat/completions");
    tracing::info!("Metrics endpoint: GET /metrics");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared upstream HTTP client with connection pooling.
///
/// No client-level timeout: each adapter attaches the configured
/// per-attempt deadline to its own request.
fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(32)
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .tcp_keepalive(std::time::Duration::from_secs(60))
        .build()
        .expect("Failed to build HTTP client")
}
