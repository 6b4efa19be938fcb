use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use fleet_dispatch_api::config::{config, StorageBackend};
use fleet_dispatch_api::database::DatabaseManager;
use fleet_dispatch_api::gateway::Gateway;
use fleet_dispatch_api::middleware::JwtIdentityResolver;
use fleet_dispatch_api::routes::app;
use fleet_dispatch_api::services::VroomClient;
use fleet_dispatch_api::state::AppState;
use fleet_dispatch_api::storage::{MemoryStore, PgStore, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting Fleet Dispatch API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set outside development");
    }

    let storage: Arc<dyn Storage> = match config.database.backend {
        StorageBackend::Memory => {
            if fleet_dispatch_api::is_production!() {
                bail!("in-memory storage is not allowed in production");
            }
            tracing::warn!("using in-memory storage; records are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres => Arc::new(PgStore::connect().await.context("failed to connect to PostgreSQL")?),
    };

    let optimizer = Arc::new(VroomClient::from_config(&config.routing).context("failed to build VROOM client")?);
    let gateway = Gateway::new(storage, optimizer, config.listing.clone());
    let state = AppState::new(gateway, Arc::new(JwtIdentityResolver::from_config()));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Fleet Dispatch API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if config.database.backend == StorageBackend::Postgres {
        DatabaseManager::close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
