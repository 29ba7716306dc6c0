//! # pdf2md-server
//!
//! Stateless HTTP service that converts uploaded PDFs into page-sectioned
//! Markdown, separating tables from prose.
//!
//! ## Why this crate?
//!
//! Plain text extraction flattens tables into runs of numbers and drags page
//! headers and footers into the body. This service reads page geometry
//! instead: ruled (or, failing that, text-aligned) grids become GFM tables,
//! text blocks that overlap a table are dropped, and the remaining prose is
//! cleaned of hyphenation and layout whitespace.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Admit   Content-Length and per-client rate checks (no body read)
//!  ├─ 2. Open    count pages, enforce MAX_PAGES (on a worker)
//!  ├─ 3. Split   one self-contained PDF per page
//!  ├─ 4. Render  tables + prose per page, fanned out over the worker pool
//!  └─ 5. Join    sections in page order, separated by `\n---\n`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_server::{AppState, PdfiumEngine, ServiceConfig, WorkerPool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::default();
//!     let engine = Arc::new(PdfiumEngine::bind(None)?);
//!     let pool = Arc::new(WorkerPool::new(config.max_workers)?);
//!     let state = AppState::new(&config, engine, pool);
//!     pdf2md_server::start_server(&config.bind_addr(), state).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` to embed the router in another service:
//! ```toml
//! pdf2md-server = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod admission;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use admission::RateLimiter;
pub use config::{RateLimit, ServiceConfig, ServiceConfigBuilder};
pub use convert::{Converter, Upload};
pub use engine::{PdfDocument, PdfEngine, PdfPage, PdfiumEngine, Rect, TableRegion, TableStrategy, TextBlock};
pub use error::{ConvertError, EngineError, PageError, PoolError};
pub use output::{ConversionResult, PageSection, PAGE_SEPARATOR};
pub use pool::WorkerPool;
pub use server::{build_router, serve, start_server, AppState};
