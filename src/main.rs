use sqlx::any::AnyPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use modular_orders::app::{default_modules, Application};
use modular_orders::backbone::store::migrate;
use modular_orders::config::Config;
use modular_orders::domain::notification::LoggingNotificationService;
use modular_orders::http;
use modular_orders::metrics::Metrics;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,modular_orders=debug")),
        )
        .init();

    tracing::info!("🚀 Starting modular orders service");

    // === 1. Configuration ===
    let config = Config::from_env()?;
    tracing::info!(
        port = config.http_port,
        nesting = ?config.tx_nesting,
        max_connections = config.db_max_connections,
        "Configuration loaded"
    );

    // === 2. Database pool and schema ===
    sqlx::any::install_default_drivers();
    tracing::info!("Connecting to database...");
    let pool = AnyPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_dsn)
        .await?;
    migrate(&pool).await?;
    tracing::info!("✅ Database schema ready");

    // === 3. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 4. Modules ===
    let app = Application::build(
        pool.clone(),
        metrics,
        config.tx_nesting,
        default_modules(Arc::new(LoggingNotificationService)),
    )?;

    // === 5. Serve until shutdown signal ===
    http::serve(app, &config).await?;

    pool.close().await;
    tracing::info!("✅ Shutdown complete");
    Ok(())
}
