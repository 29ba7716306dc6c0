//! Page splitting: one opened document in, one self-contained PDF per page
//! out.
//!
//! Each [`PageBuffer`] owns its bytes outright, so buffers can be handed to
//! different workers with nothing shared between them or with the source
//! document.

use crate::engine::PdfDocument;
use crate::error::EngineError;
use tracing::debug;

/// A single page re-serialised as its own PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBuffer {
    /// 0-based index of the page in the source document.
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// Split every page of `document` into its own buffer, in page order.
///
/// Fails on the first page that cannot be extracted. The caller keeps the
/// document alive until this returns, so all buffers exist before the
/// source is released.
pub fn split_pages<D: PdfDocument>(document: &D) -> Result<Vec<PageBuffer>, EngineError> {
    let count = document.page_count();
    let buffers = (0..count)
        .map(|index| {
            document
                .extract_page(index)
                .map(|bytes| PageBuffer { index, bytes })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "Split {} pages ({} bytes total)",
        buffers.len(),
        buffers.iter().map(|b| b.bytes.len()).sum::<usize>()
    );
    Ok(buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PdfPage, Rect, TableRegion, TableStrategy, TextBlock};

    struct NoPage;

    impl PdfPage for NoPage {
        fn rect(&self) -> Rect {
            Rect::default()
        }
        fn find_tables(&self, _: &Rect, _: TableStrategy) -> Result<Vec<TableRegion>, EngineError> {
            Ok(Vec::new())
        }
        fn text_blocks(&self, _: &Rect) -> Result<Vec<TextBlock>, EngineError> {
            Ok(Vec::new())
        }
    }

    struct Pages {
        pages: Vec<&'static str>,
        broken: Option<usize>,
    }

    impl PdfDocument for Pages {
        type Page<'p> = NoPage;

        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page(&self, _index: usize) -> Result<NoPage, EngineError> {
            Ok(NoPage)
        }

        fn extract_page(&self, index: usize) -> Result<Vec<u8>, EngineError> {
            if self.broken == Some(index) {
                return Err(EngineError::Extract {
                    page: index + 1,
                    detail: "xref damaged".into(),
                });
            }
            Ok(self.pages[index].as_bytes().to_vec())
        }
    }

    #[test]
    fn test_split_preserves_order_and_content() {
        let doc = Pages {
            pages: vec!["alpha", "beta", "gamma"],
            broken: None,
        };
        let buffers = split_pages(&doc).unwrap();
        assert_eq!(
            buffers,
            vec![
                PageBuffer { index: 0, bytes: b"alpha".to_vec() },
                PageBuffer { index: 1, bytes: b"beta".to_vec() },
                PageBuffer { index: 2, bytes: b"gamma".to_vec() },
            ]
        );
    }

    #[test]
    fn test_split_empty_document() {
        let doc = Pages {
            pages: Vec::new(),
            broken: None,
        };
        assert!(split_pages(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_split_reports_failing_page() {
        let doc = Pages {
            pages: vec!["alpha", "beta"],
            broken: Some(1),
        };
        let err = split_pages(&doc).unwrap_err();
        assert!(matches!(err, EngineError::Extract { page: 2, .. }));
    }
}
