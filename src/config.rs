use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub src_bucket: String,
    pub dst_bucket: String,
    pub filter: Option<String>,
    pub limit: u64,
    pub storage_root: String,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Deduplicating bucket-to-bucket image copier")]
pub struct Args {
    /// Source bucket name (overrides IMG_DEDUPER_SRC_BUCKET)
    #[arg(long)]
    pub src: Option<String>,

    /// Destination bucket name (overrides IMG_DEDUPER_DST_BUCKET)
    #[arg(long)]
    pub dst: Option<String>,

    /// Glob pattern restricting which object names are processed
    /// (overrides IMG_DEDUPER_FILTER; all objects when absent)
    #[arg(long)]
    pub filter: Option<String>,

    /// Number of objects to process before terminating; 0 means unlimited
    /// (overrides IMG_DEDUPER_LIMIT)
    #[arg(long)]
    pub limit: Option<u64>,

    /// Directory holding one subdirectory per bucket
    /// (overrides IMG_DEDUPER_STORAGE_ROOT)
    #[arg(long)]
    pub storage_root: Option<String>,

    /// Database URL (overrides IMG_DEDUPER_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Host to bind the health/metrics server to (overrides IMG_DEDUPER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind the health/metrics server to (overrides IMG_DEDUPER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable debug-level logging
    #[arg(long)]
    pub debug: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into an AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_src = env::var("IMG_DEDUPER_SRC_BUCKET").unwrap_or_else(|_| "src-bucket".into());
        let env_dst = env::var("IMG_DEDUPER_DST_BUCKET").unwrap_or_else(|_| "dst-bucket".into());
        let env_filter = env::var("IMG_DEDUPER_FILTER").ok();
        let env_limit = match env::var("IMG_DEDUPER_LIMIT") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing IMG_DEDUPER_LIMIT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 0,
            Err(err) => return Err(err).context("reading IMG_DEDUPER_LIMIT"),
        };
        let env_storage =
            env::var("IMG_DEDUPER_STORAGE_ROOT").unwrap_or_else(|_| "./data/buckets".into());
        let env_db = env::var("IMG_DEDUPER_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/images.db".into());
        let env_host = env::var("IMG_DEDUPER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("IMG_DEDUPER_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMG_DEDUPER_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8080,
            Err(err) => return Err(err).context("reading IMG_DEDUPER_PORT"),
        };

        // --- Merge ---
        Ok(Self {
            src_bucket: args.src.unwrap_or(env_src),
            dst_bucket: args.dst.unwrap_or(env_dst),
            filter: args.filter.or(env_filter),
            limit: args.limit.unwrap_or(env_limit),
            storage_root: args.storage_root.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            debug: args.debug,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
