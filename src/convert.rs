//! Conversion orchestration: validate, split, fan out, join in page order.
//!
//! ## Why does the document never leave the worker?
//!
//! Opening, counting and splitting all happen inside a single pool job. The
//! only things that cross back to the async side are the page count and the
//! owned per-page buffers, so the request task never holds a pdfium handle
//! and never blocks the runtime on PDF parsing.
//!
//! ## Ordering
//!
//! Pages are dispatched in index order but may finish in any order. Results
//! are re-sorted by page index in [`ConversionResult::assemble`]; completion
//! order is never trusted.

use crate::engine::{PdfDocument, PdfEngine};
use crate::error::{ConvertError, PoolError};
use crate::output::{ConversionResult, PageSection};
use crate::pipeline::page::render_page;
use crate::pipeline::split::{split_pages, PageBuffer};
use crate::pool::WorkerPool;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name, if any.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.into()),
            bytes,
        }
    }
}

/// Converts uploads using a shared engine and worker pool.
///
/// Cheap to clone; every clone shares the same engine and pool.
pub struct Converter<E: PdfEngine> {
    engine: Arc<E>,
    pool: Arc<WorkerPool>,
    max_pages: usize,
}

impl<E: PdfEngine> Clone for Converter<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            pool: Arc::clone(&self.pool),
            max_pages: self.max_pages,
        }
    }
}

impl<E: PdfEngine> Converter<E> {
    pub fn new(engine: Arc<E>, pool: Arc<WorkerPool>, max_pages: usize) -> Self {
        Self {
            engine,
            pool,
            max_pages,
        }
    }

    /// Convert one upload to Markdown.
    ///
    /// # Errors
    /// Returns `Err(ConvertError)` only for request-level failures:
    /// - the file name does not end in `.pdf`
    /// - the document has more than `max_pages` pages
    /// - the document cannot be opened or split, or a pool job is lost
    ///
    /// A page that fails to render does **not** fail the request; it shows up
    /// as an inline error section in the output.
    pub async fn convert(&self, upload: Upload) -> Result<ConversionResult, ConvertError> {
        let result = self.run(upload).await;
        match &result {
            Err(e) if e.is_client_error() => debug!("Upload rejected: {}", e),
            Err(e) => error!("Conversion failed: {}", e),
            Ok(_) => {}
        }
        result
    }

    async fn run(&self, upload: Upload) -> Result<ConversionResult, ConvertError> {
        check_file_type(upload.filename.as_deref())?;

        // ── Step 1: Open, count and split on a worker ────────────────────
        let engine = Arc::clone(&self.engine);
        let max_pages = self.max_pages;
        let bytes = upload.bytes;
        let (buffers, started) = self
            .pool
            .submit(move || prepare(engine.as_ref(), &bytes, max_pages))
            .await??;

        info!(
            "Processing {} pages from {}",
            buffers.len(),
            upload.filename.as_deref().unwrap_or("<unnamed>")
        );

        // ── Step 2: Fan out one job per page ─────────────────────────────
        let jobs = buffers.into_iter().map(|buffer| {
            let engine = Arc::clone(&self.engine);
            self.pool.submit(move || render_page(engine.as_ref(), &buffer))
        });

        // ── Step 3: Join everything, then restore page order ─────────────
        let sections = join_all(jobs)
            .await
            .into_iter()
            .collect::<Result<Vec<PageSection>, PoolError>>()?;

        let mut failed = 0;
        for section in sections.iter().filter(|s| s.is_failed()) {
            failed += 1;
            if let PageSection::Failed { error, .. } = section {
                warn!("Page {} failed: {}", error.page(), error);
            }
        }

        let result = ConversionResult::assemble(sections, started.elapsed());
        info!(
            "Conversion complete: {} pages ({} failed) in {:.2}s",
            result.pages_processed, failed, result.processing_time_sec
        );
        Ok(result)
    }
}

/// Reject anything whose name does not end in `.pdf` (any case).
pub fn check_file_type(filename: Option<&str>) -> Result<(), ConvertError> {
    match filename {
        Some(name) if name.to_ascii_lowercase().ends_with(".pdf") => Ok(()),
        other => Err(ConvertError::InvalidFileType {
            filename: other.map(str::to_string),
        }),
    }
}

/// Blocking part of a conversion: open, enforce the page limit, split.
///
/// The timer starts once the page count has been accepted. The document is
/// dropped only after every page buffer exists.
fn prepare<E: PdfEngine>(
    engine: &E,
    bytes: &[u8],
    max_pages: usize,
) -> Result<(Vec<PageBuffer>, Instant), ConvertError> {
    let document = engine.open(bytes)?;
    let pages = document.page_count();
    if pages > max_pages {
        warn!("Rejected document with {} pages (max {})", pages, max_pages);
        return Err(ConvertError::TooManyPages {
            pages,
            max: max_pages,
        });
    }

    let started = Instant::now();
    let buffers = split_pages(&document)?;
    drop(document);
    Ok((buffers, started))
}
