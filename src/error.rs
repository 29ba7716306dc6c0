//! Error types for the pdf2md-server library.
//!
//! Three tiers reflect three distinct failure scopes:
//!
//! * [`ConvertError`]: **Request-fatal**: the upload is rejected or the
//!   conversion cannot proceed (wrong file type, too many pages, rate limited,
//!   engine failure while opening or splitting). Every request ends in either a
//!   successful [`crate::output::ConversionResult`] or exactly one of these.
//!
//! * [`PageError`]: **Page-local**: one page could not be rendered. It is
//!   carried inside [`crate::output::PageSection::Failed`] and becomes an inline
//!   error section; sibling pages are unaffected.
//!
//! * [`EngineError`]: raised by the PDF engine adapter. Depending on where it
//!   happens it is folded into one of the two above.

use axum::http::StatusCode;
use thiserror::Error;

/// All request-level errors returned by the conversion service.
///
/// Page-level failures use [`PageError`] and never surface here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Client input errors ───────────────────────────────────────────────
    /// The uploaded file name does not indicate a PDF.
    #[error("Only PDF files are allowed.")]
    InvalidFileType { filename: Option<String> },

    /// The declared (or streamed) payload exceeds the configured maximum.
    #[error("File too large. Maximum allowed size is {}MB.", .limit_bytes / (1024 * 1024))]
    PayloadTooLarge { limit_bytes: u64 },

    /// The document has more pages than the configured maximum.
    #[error("PDF too long ({pages} pages). Max is {max}.")]
    TooManyPages { pages: usize, max: usize },

    /// The client exceeded its request quota.
    #[error("Rate limit exceeded: {limit}")]
    RateLimited { limit: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected failure while opening, splitting or dispatching.
    ///
    /// The payload is logged server-side only; see [`ConvertError::detail`].
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Message safe to return to the caller.
    ///
    /// Internal errors are reduced to a generic sentence so that engine or
    /// filesystem details never leak to clients.
    pub fn detail(&self) -> String {
        match self {
            ConvertError::Internal(_) => "An error occurred during conversion.".to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status the error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ConvertError::InvalidFileType { .. } => StatusCode::BAD_REQUEST,
            ConvertError::PayloadTooLarge { .. } | ConvertError::TooManyPages { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ConvertError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ConvertError::InvalidConfig(_) | ConvertError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this is a client input error rather than a server-side failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ConvertError::Internal(_) | ConvertError::InvalidConfig(_)
        )
    }
}

impl From<EngineError> for ConvertError {
    fn from(e: EngineError) -> Self {
        ConvertError::Internal(e.to_string())
    }
}

impl From<PoolError> for ConvertError {
    fn from(e: PoolError) -> Self {
        ConvertError::Internal(e.to_string())
    }
}

/// A failure contained to a single page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The engine reported an error while reopening or reading the page.
    #[error("{detail}")]
    Engine { page: usize, detail: String },

    /// The engine panicked while processing the page.
    #[error("page worker panicked: {detail}")]
    Panicked { page: usize, detail: String },
}

impl PageError {
    /// 1-based page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Engine { page, .. } | PageError::Panicked { page, .. } => *page,
        }
    }
}

/// Errors raised by a [`crate::engine::PdfEngine`] implementation.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Could not bind to the pdfium shared library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    Bind(String),

    /// The bytes could not be parsed as a PDF.
    #[error("Failed to open PDF: {0}")]
    Open(String),

    /// A page could not be loaded or inspected.
    #[error("Failed to read page {page}: {detail}")]
    Page { page: usize, detail: String },

    /// A single-page copy could not be produced.
    #[error("Failed to extract page {page}: {detail}")]
    Extract { page: usize, detail: String },
}

/// Errors raised by the [`crate::pool::WorkerPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool could not be built.
    #[error("Failed to build worker pool: {0}")]
    Build(String),

    /// A job panicked outside of page-level containment.
    #[error("Worker job panicked: {0}")]
    Panicked(String),

    /// The job's result channel was dropped before completion.
    #[error("Worker dropped the job result")]
    WorkerLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_pages_names_count_and_limit() {
        let e = ConvertError::TooManyPages { pages: 301, max: 300 };
        let msg = e.to_string();
        assert!(msg.contains("301"), "got: {msg}");
        assert!(msg.contains("300"), "got: {msg}");
    }

    #[test]
    fn test_payload_too_large_reports_megabytes() {
        let e = ConvertError::PayloadTooLarge {
            limit_bytes: 50 * 1024 * 1024,
        };
        assert_eq!(e.to_string(), "File too large. Maximum allowed size is 50MB.");
    }

    #[test]
    fn test_internal_detail_is_generic() {
        let e = ConvertError::Internal("pdfium: FormatError at xref".into());
        assert_eq!(e.detail(), "An error occurred during conversion.");
        assert!(!e.detail().contains("xref"));
        assert!(!e.is_client_error());
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_statuses_follow_error_class() {
        assert_eq!(
            ConvertError::TooManyPages { pages: 2, max: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ConvertError::RateLimited { limit: "2 per 1 minute".into() }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ConvertError::InvalidFileType { filename: None }.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let e = ConvertError::InvalidFileType {
            filename: Some("notes.txt".into()),
        };
        assert_eq!(e.detail(), "Only PDF files are allowed.");
        assert!(e.is_client_error());
    }

    #[test]
    fn test_engine_error_becomes_internal() {
        let e: ConvertError = EngineError::Open("bad header".into()).into();
        assert!(matches!(e, ConvertError::Internal(ref d) if d.contains("bad header")));
    }

    #[test]
    fn test_page_error_display_and_page() {
        let e = PageError::Engine {
            page: 3,
            detail: "no page tree".into(),
        };
        assert_eq!(e.to_string(), "no page tree");
        assert_eq!(e.page(), 3);
    }
}
