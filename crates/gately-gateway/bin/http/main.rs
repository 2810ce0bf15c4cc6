mod cli;

use std::sync::Arc;

use crate::cli::{StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use gately_cache::{MokaTier, RedisTier, TieredCache};
use gately_gateway::{App, AppState};
use gately_generator::UuidGenerator;
use gately_service::{MappingService, UrlMapper};
use gately_storage::{InMemoryStore, MySqlStore, UrlStore};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    let _telemetry =
        gately_telemetry::init(&config.telemetry()).context("failed to initialize telemetry")?;

    info!(
        host = %config.host,
        port = config.port,
        storage_backend = %config.storage,
        shared_tier = config.redis_url.is_some(),
        "starting gately"
    );

    let cache = build_cache(&config).await?;

    match config.storage {
        StorageBackendArg::InMemory => run_server(&config, InMemoryStore::new(), cache).await,
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(mysql_dsn, &config.mysql_table)
                .await
                .context("failed to connect to MySQL")?;
            store
                .ensure_schema()
                .await
                .context("failed to prepare MySQL schema")?;
            run_server(&config, store, cache).await
        }
    }
}

async fn build_cache(config: &CLI) -> anyhow::Result<TieredCache> {
    let cache = TieredCache::new().with_tier(MokaTier::from(config.local_tier()));

    let Some(redis_url) = config.redis_url.as_deref() else {
        return Ok(cache);
    };
    let shared = RedisTier::connect(redis_url, config.shared_tier())
        .await
        .context("failed to connect to Redis")?;
    Ok(cache.with_tier(shared))
}

async fn run_server<S: UrlStore>(config: &CLI, store: S, cache: TieredCache) -> anyhow::Result<()> {
    let service = Arc::new(MappingService::new(
        Arc::new(store),
        cache,
        UuidGenerator::new(),
        config.mapping(),
    ));
    let mapper: Arc<dyn UrlMapper> = service.clone();
    let router = App::router(AppState::new(mapper, config.request_timeout()));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    info!(listen_addr = %listener.local_addr()?, "serving HTTP");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("draining pending hit updates");
    service.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
