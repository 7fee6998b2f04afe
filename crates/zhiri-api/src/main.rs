//! Zhiri API Server
//!
//! Authentication server for the Zhiri marketplace.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use zhiri_api::{
    create_router, db,
    state::{AppState, Stores},
    sweeper::spawn_token_sweeper,
};
use zhiri_core::{AppConfig, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: optional TOML file, then environment
    let config = match std::env::var("ZHIRI_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .with_context(|| format!("loading {path}"))?
            .with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);
    config.validate().context("invalid configuration")?;

    let stores = if std::env::var("ZHIRI_STORAGE").as_deref() == Ok("memory") {
        tracing::warn!("Using in-memory storage; all data is lost on exit");
        Stores::in_memory()
    } else {
        let pool = db::create_pool(&config.database).await?;
        db::run_migrations(&pool).await?;
        Stores::postgres(pool)
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let sweep_interval = config.auth.sweep_interval();

    // Create application state
    let state = Arc::new(AppState::new(config, stores));
    let sweeper = spawn_token_sweeper(state.ledger.clone(), sweep_interval);

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Zhiri API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    tracing::info!("Server stopped");

    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "zhiri_api={level},audit={level},tower_http={level}",
            level = logging.level
        ))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
