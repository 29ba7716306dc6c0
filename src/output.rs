//! Output types: per-page outcomes and the assembled conversion result.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Literal separator placed between consecutive page sections.
pub const PAGE_SEPARATOR: &str = "\n---\n";

/// Outcome of rendering one page.
///
/// A page either produced its Markdown section or failed in a way that was
/// contained to that page. Both variants still render into the final
/// document, so the orchestrator never has to unwind a failed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageSection {
    Rendered { index: usize, markdown: String },
    Failed { index: usize, error: PageError },
}

impl PageSection {
    /// 0-based index of the page in the source document.
    pub fn index(&self) -> usize {
        match self {
            PageSection::Rendered { index, .. } | PageSection::Failed { index, .. } => *index,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PageSection::Failed { .. })
    }

    /// Markdown for this page. Failures become an inline error section.
    pub fn into_markdown(self) -> String {
        match self {
            PageSection::Rendered { markdown, .. } => markdown,
            PageSection::Failed { index, error } => {
                format!("{}\n\nProcessing error: {}", page_heading(index), error)
            }
        }
    }
}

/// `## Page N` heading for a 0-based page index.
pub fn page_heading(index: usize) -> String {
    format!("## Page {}", index + 1)
}

/// Result of converting one document. Serialises to the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Number of pages in the document.
    pub pages_processed: usize,

    /// Wall-clock seconds spent on splitting and page work, two decimals.
    pub processing_time_sec: f64,

    /// Page sections in ascending page order, joined by [`PAGE_SEPARATOR`].
    pub content: String,
}

impl ConversionResult {
    /// Assemble a result from page sections.
    ///
    /// Sections are sorted by page index first; the caller may pass them in
    /// completion order.
    pub fn assemble(mut sections: Vec<PageSection>, elapsed: Duration) -> Self {
        sections.sort_by_key(PageSection::index);
        let pages_processed = sections.len();
        let content = sections
            .into_iter()
            .map(PageSection::into_markdown)
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);

        Self {
            pages_processed,
            processing_time_sec: round_secs(elapsed),
            content,
        }
    }
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
