use anyhow::{Context, Result};
use axum::Router;
use img_deduper::{
    config::AppConfig,
    routes,
    services::{
        dedup_service::{DedupOptions, DedupService},
        fs_store::FsObjectStore,
        index::FingerprintIndex,
        object_store::ObjectStore,
    },
};
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    let default_level = if cfg.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("Starting img-deduper with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    // SQLx opens an existing file only, so make sure the database file and
    // its directory exist first.
    if let Some(db_path) = cfg.database_url.strip_prefix("sqlite://") {
        let db_path = db_path.strip_prefix("file:").unwrap_or(db_path);
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(db_path)
            .with_context(|| format!("creating database file {}", db_path))?;
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&cfg.database_url)
            .await
            .context("connecting to metadata database")?,
    );
    tracing::info!("database connection established");

    // --- Initialize core service ---
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&cfg.storage_root));
    let index = FingerprintIndex::new(db);
    let service = Arc::new(DedupService::new(
        store,
        index,
        DedupOptions {
            src_bucket: cfg.src_bucket.clone(),
            dst_bucket: cfg.dst_bucket.clone(),
            filter: cfg.filter.clone(),
            limit: cfg.limit,
        },
    ));

    // --- Start health/metrics server ---
    let app: Router = routes::routes().with_state(service.clone());
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(
        "Serving /healthz, /readyz and /metrics on http://{}",
        listener.local_addr()?
    );

    let server_cancel = service.cancel_token();
    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app)
            .with_graceful_shutdown(server_cancel.cancelled_owned())
            .await
        {
            tracing::error!("health server error: {}", err);
        }
    });

    // --- Interrupt handling ---
    // First signal asks the loop to stop; a second one exits outright.
    {
        let service = service.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping service");
                service.stop();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("second interrupt, exiting immediately");
                std::process::exit(2);
            }
        });
    }

    // --- Run the pipeline ---
    let summary = service.run().await?;
    tracing::info!(
        attempted = summary.attempted,
        copied = summary.copied,
        skipped = summary.skipped,
        failed = summary.failed,
        "service process completed"
    );

    // Release the web server and wait for it to drain.
    service.stop();
    server.await?;

    Ok(())
}
