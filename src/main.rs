use potencialize_api::app::{app, build_store, AppState};
use potencialize_api::config::{config, StoreBackend};
use potencialize_api::database::DatabaseManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    config.validate()?;
    tracing::info!(
        "Starting Potencialize API in {:?} mode ({:?} store)",
        config.environment,
        config.database.backend
    );
    if potencialize_api::is_production!() && config.database.backend == StoreBackend::Memory {
        tracing::warn!("Running production with the in-memory store; data will not survive a restart");
    }

    let store = build_store(config);
    store.provision(&config.tenancy.default_tenant).await?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Potencialize API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if config.database.backend == StoreBackend::Postgres {
        DatabaseManager::close_all().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
