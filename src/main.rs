use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cache;
mod config;
mod domain;
mod http;
mod ingest;
mod messaging;
mod metrics;
mod models;
mod store;
mod utils;

use config::Config;
use ingest::{IngestionHandle, IngestionPipeline};
use messaging::{KafkaDeadLetterProducer, KafkaOrderConsumer};
use store::{InMemoryOrderRepository, OrderRepository, OrderStore, PostgresOrderRepository};
use utils::Shutdown;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_cache_service=debug")),
        )
        .init();

    tracing::info!("Starting order cache service");

    let config = Config::from_env()?;
    let metrics = Arc::new(metrics::Metrics::new()?);

    // === 1. Backing store ===
    let repository: Arc<dyn OrderRepository> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let repository =
                PostgresOrderRepository::connect(url, config.db_max_connections, config.retry.clone())
                    .await?;
            repository.ensure_schema().await?;
            Arc::new(repository)
        }
        None => {
            tracing::warn!("No database configured, orders are kept in memory only");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    // === 2. Cache-aside store (warms the cache) ===
    let store = Arc::new(OrderStore::new(repository, config.cache, metrics.clone()).await);
    tracing::info!(mode = ?store.mode(), "Order store ready");

    // === 3. Ingestion ===
    let shutdown = Shutdown::new();
    let dead_letters = Arc::new(KafkaDeadLetterProducer::new(&config.kafka)?);
    let pipeline = Arc::new(IngestionPipeline::new(store.clone(), dead_letters, metrics.clone()));
    let source = KafkaOrderConsumer::new(&config.kafka)?;
    let ingestion = IngestionHandle::spawn(pipeline, source, config.consumer_backoff, shutdown.subscribe());

    // === 4. Lookup API ===
    let server = http::build_server(
        http::AppState {
            store,
            metrics,
        },
        &config.addr(),
        shutdown.subscribe(),
    )?;

    let served = utils::serve_until_signal(server, shutdown_signal(), &shutdown).await;

    ingestion.join().await;
    served?;

    tracing::info!("Order cache service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
