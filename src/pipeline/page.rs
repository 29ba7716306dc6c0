//! Per-page rendering: one single-page buffer in, one Markdown section out.
//!
//! ## Why can't this fail?
//!
//! A document is only as useful as its worst page if one bad page aborts the
//! request. [`render_page`] folds every engine error, and every panic raised
//! across the pdfium FFI boundary, into a [`PageSection::Failed`] so that
//! sibling pages always make it into the output.

use super::normalize::normalize_text;
use super::split::PageBuffer;
use super::tables::extract_tables;
use crate::engine::{PdfDocument, PdfEngine, PdfPage, Rect};
use crate::error::{EngineError, PageError};
use crate::output::{page_heading, PageSection};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Points trimmed from the top and bottom of the page to skip running
/// headers and footers.
pub const CONTENT_MARGIN: f32 = 40.0;

/// Blocks whose trimmed text is this short or shorter are dropped.
pub const MIN_BLOCK_CHARS: usize = 5;

/// Render one page. Never fails; errors become an inline error section.
pub fn render_page<E: PdfEngine>(engine: &E, page: &PageBuffer) -> PageSection {
    let index = page.index;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let document = engine.open(&page.bytes)?;
        let loaded = document.page(0)?;
        render_content(&loaded, index)
    }));

    match outcome {
        Ok(Ok(markdown)) => PageSection::Rendered { index, markdown },
        Ok(Err(e)) => PageSection::Failed {
            index,
            error: PageError::Engine {
                page: index + 1,
                detail: e.to_string(),
            },
        },
        Err(payload) => PageSection::Failed {
            index,
            error: PageError::Panicked {
                page: index + 1,
                detail: panic_message(payload.as_ref()),
            },
        },
    }
}

/// Build the Markdown section for an already loaded page.
pub fn render_content<P: PdfPage>(page: &P, index: usize) -> Result<String, EngineError> {
    let region = content_region(&page.rect());
    let tables = extract_tables(page, &region)?;

    let mut blocks = page.text_blocks(&region)?;
    blocks.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0).then(a.bbox.x0.total_cmp(&b.bbox.x0)));

    let paragraphs: Vec<String> = blocks
        .iter()
        .filter(|block| !tables.iter().any(|t| t.bbox.intersects(&block.bbox)))
        .filter_map(|block| {
            let raw = block.text.trim();
            (raw.chars().count() > MIN_BLOCK_CHARS).then(|| normalize_text(raw))
        })
        .collect();

    debug!(
        "Page {}: {} tables, {} of {} text blocks kept",
        index + 1,
        tables.len(),
        paragraphs.len(),
        blocks.len()
    );

    let mut sections = vec![page_heading(index)];
    if !tables.is_empty() {
        let rendered: Vec<&str> = tables.iter().map(|t| t.markdown.as_str()).collect();
        sections.push(format!("### Tables\n{}", rendered.join("\n\n")));
    }
    if !paragraphs.is_empty() {
        sections.push(format!("### Text Content\n{}", paragraphs.join("\n\n")));
    }
    Ok(sections.join("\n\n"))
}

/// Page rectangle minus the header and footer margins.
pub fn content_region(page: &Rect) -> Rect {
    page.inset(0.0, CONTENT_MARGIN)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
