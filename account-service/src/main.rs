use account_service::{build_router, config::AccountConfig, db, store::PgStore, AppState};
use service_core::observability::init_tracing;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AccountConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting account service"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::Error::new(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::Error::new(e)))?;

    let store = Arc::new(PgStore::new(pool));
    let state = AppState::new(config.clone(), store)?;
    let app = build_router(state);

    let addr: SocketAddr = config.common.bind_address().parse().map_err(|e| {
        service_core::error::AppError::ConfigError(anyhow::anyhow!("Invalid bind address: {}", e))
    })?;

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
