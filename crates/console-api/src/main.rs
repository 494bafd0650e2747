use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use console_api::{build_router, config::Config, state::AppState};
use console_persist::{ConsoleClient, ConsoleClientBuilder, ReconcileReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Console API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let backend = config.storage.backend()?;
    tracing::info!(backend = ?backend, database = %config.storage.database, "Opening store");
    let console = ConsoleClientBuilder::new()
        .backend(backend)
        .mongodb_uri(&config.mongodb_uri)
        .database(&config.storage.database)
        .transactions(config.storage.transactions)
        .retry_attempts(config.storage.retry_attempts)
        .build()
        .await?;
    console.ping().await?;
    tracing::info!("Store ready");

    if config.storage.reconcile_interval_secs > 0 {
        spawn_reconciler(
            console.clone(),
            Duration::from_secs(config.storage.reconcile_interval_secs),
        );
    }

    let state = Arc::new(AppState::new(config.clone(), console));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically repair thread recency markers and orphans left behind by
/// partial writes
fn spawn_reconciler(console: ConsoleClient, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            match console.reconcile_all().await {
                Ok(report) if report == ReconcileReport::default() => {
                    tracing::debug!("Reconcile sweep found nothing to repair")
                }
                Ok(report) => tracing::info!(
                    repaired = report.repaired,
                    purged = report.purged,
                    "Reconcile sweep finished"
                ),
                Err(e) => tracing::warn!("Reconcile sweep failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
