//! Server binary for pdf2md-server.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! to `ServiceConfig`, binds pdfium, builds the worker pool and serves until
//! Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2md_server::{start_server, AppState, PdfiumEngine, ServiceConfig, WorkerPool};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /convert   multipart form with a `file` field holding a .pdf
  GET  /health    liveness check

EXAMPLES:
  pdf2md-server
  MAX_WORKERS=8 RATE_LIMIT=10/minute pdf2md-server --port 9000
  curl -F file=@report.pdf http://127.0.0.1:8000/convert

PDFIUM:
  The pdfium shared library is looked up in PDFIUM_LIB_PATH, then the
  working directory, then the system library path.
"#;

/// Serve PDF-to-Markdown conversion over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-server",
    version,
    about = "Serve PDF-to-Markdown conversion over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Interface to bind.
    #[arg(long, env = "APP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// TCP port.
    #[arg(long, env = "APP_PORT", default_value_t = 8000)]
    port: u16,

    /// Page worker threads, fixed for the life of the process.
    #[arg(long, env = "MAX_WORKERS", default_value_t = 4)]
    max_workers: usize,

    /// Largest accepted upload in megabytes.
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value_t = 50)]
    max_file_size_mb: u64,

    /// Largest accepted document in pages.
    #[arg(long, env = "MAX_PAGES", default_value_t = 300)]
    max_pages: usize,

    /// Per-client quota, e.g. `2/minute`, `10/5 minutes`, `100 per hour`.
    #[arg(long, env = "RATE_LIMIT", default_value = "2/minute")]
    rate_limit: String,

    /// Log level when RUST_LOG is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Path to the pdfium library or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = cli.log_level.to_ascii_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let config = ServiceConfig::builder()
        .host(cli.host)
        .port(cli.port)
        .max_workers(cli.max_workers)
        .max_file_size_mb(cli.max_file_size_mb)
        .max_pages(cli.max_pages)
        .rate_limit(cli.rate_limit)
        .build()
        .context("Invalid configuration")?;

    info!(
        "Starting pdf2md-server v{}: {} workers, {}MB max upload, {} max pages, {}",
        env!("CARGO_PKG_VERSION"),
        config.max_workers,
        config.max_file_size_mb(),
        config.max_pages,
        config.rate_limit
    );

    // ── Process-wide services ────────────────────────────────────────────
    let engine = PdfiumEngine::bind(cli.pdfium_lib_path.as_deref())
        .context("Failed to load the PDFium engine")?;
    let pool = WorkerPool::new(config.max_workers).context("Failed to start worker pool")?;

    let state = AppState::new(&config, Arc::new(engine), Arc::new(pool));
    start_server(&config.bind_addr(), state)
        .await
        .with_context(|| format!("Server on {} failed", config.bind_addr()))?;

    info!("Server stopped");
    Ok(())
}
