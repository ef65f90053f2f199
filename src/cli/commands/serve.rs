use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::handlers::AppState;

pub async fn handle(config: AppConfig, migrate: bool) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting CMS admin API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("connecting to database")?;
    if migrate {
        DatabaseManager::migrate(&pool).await.context("applying migrations")?;
    }

    let bind_addr = config.bind_address();
    let app = crate::app(AppState::new(pool, config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
