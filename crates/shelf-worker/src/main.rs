//! Shelf Worker - Main entry point

use anyhow::Result;
use serde_json::json;
use shelf_common::logging::{init_logging, LogConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use shelf_worker::{
    cache::{CacheError, CacheSynchronizer, PgCache, VersionedCache, BOOKS_KEY},
    config::Config,
    db,
    index::PgSearchIndex,
    ingest::Ingestor,
    lookup::GoogleBooksClient,
    queue::PgQueue,
    status,
    store::PgBookStore,
    WorkerContext,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("shelf-worker")
        .filter_directives("shelf_worker=info,tower_http=info,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting shelf worker");

    let config = Config::load()?;
    info!(
        "Configuration loaded - status endpoint will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database).await?;
    db::migrate(&pool).await?;

    let cache = Arc::new(PgCache::new(pool.clone()));
    match cache.add(BOOKS_KEY, json!([])).await {
        Ok(version) => info!(version = version.0, "Created empty book cache entry"),
        Err(CacheError::Conflict(_)) => {},
        Err(e) => return Err(e.into()),
    }

    let ctx = WorkerContext::new(
        Arc::new(PgBookStore::new(pool.clone())),
        Arc::new(GoogleBooksClient::new(&config.books_api())?),
        Arc::new(PgSearchIndex::new(pool.clone())),
        cache,
    );

    let subscription = Arc::new(PgQueue::new(pool.clone(), config.queue_config()));
    let ingestor = Ingestor::new(&ctx, subscription, config.pool());

    let synchronizer = CacheSynchronizer::new(&ctx, config.sync_interval(), config.retry_policy());
    let sync_task = tokio::spawn(synchronizer.run());

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Status endpoint listening on {}", listener.local_addr()?);

    let server = axum::serve(listener, status::router(ctx.processed.clone()))
        .with_graceful_shutdown(shutdown_signal());

    let outcome = tokio::select! {
        result = ingestor.run() => match result {
            Ok(()) => {
                info!("Ingestion loop finished");
                Ok(())
            },
            Err(e) => {
                error!(error = %e, "Ingestion failed, shutting down");
                Err(e.into())
            },
        },
        result = server => {
            info!("Status endpoint stopped");
            result.map_err(anyhow::Error::from)
        },
    };

    sync_task.abort();
    pool.close().await;

    info!(processed = ctx.processed.get(), "Shelf worker stopped");
    outcome
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
