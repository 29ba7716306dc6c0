//! pdfium-render implementation of the engine traits.
//!
//! ## Why load geometry eagerly?
//!
//! A pdfium page handle borrows its document and every call goes through the
//! library's global lock (`thread_safe` feature). Reading the characters,
//! text segments and path segments once per page, then handing them to
//! [`super::layout`], keeps pdfium calls to a minimum and makes table
//! finding independent of the binding.
//!
//! pdfium reports coordinates with a bottom-left origin; everything leaving
//! this module is flipped to top-left.

use super::layout::{self, PathOp, TextSpan};
use super::{PdfDocument, PdfEngine, PdfPage, Rect, TableRegion, TableStrategy, TextBlock};
use crate::error::EngineError;
use pdfium_render::prelude::{
    PdfDocument as RawDocument, PdfPageObject, PdfPageObjectCommon, PdfPageObjectsCommon,
    PdfPathSegmentType, PdfPathSegments, Pdfium,
};
use pdfplumber_core::{Char, Edge};
use std::path::Path;
use tracing::{debug, info};

/// A bound pdfium library shared by every worker.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind to pdfium.
    ///
    /// Tries `lib_path` first (a library file or the directory holding it),
    /// then the platform library in the working directory, then the system
    /// library.
    pub fn bind(lib_path: Option<&Path>) -> Result<Self, EngineError> {
        let bindings = match lib_path {
            Some(path) => {
                let file = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(path)
                } else {
                    path.to_path_buf()
                };
                info!("Binding pdfium from {}", file.display());
                Pdfium::bind_to_library(&file)
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| EngineError::Bind(format!("{:?}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfEngine for PdfiumEngine {
    type Document<'a> = PdfiumDocument<'a>;

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<PdfiumDocument<'a>, EngineError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| EngineError::Open(format!("{:?}", e)))?;
        Ok(PdfiumDocument {
            pdfium: &self.pdfium,
            document,
        })
    }
}

/// An opened pdfium document.
pub struct PdfiumDocument<'a> {
    pdfium: &'a Pdfium,
    document: RawDocument<'a>,
}

impl PdfDocument for PdfiumDocument<'_> {
    type Page<'p>
        = PdfiumPage
    where
        Self: 'p;

    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page(&self, index: usize) -> Result<PdfiumPage, EngineError> {
        let page_err = |detail: String| EngineError::Page {
            page: index + 1,
            detail,
        };
        let raw_index = u16::try_from(index).map_err(|e| page_err(e.to_string()))?;
        let page = self
            .document
            .pages()
            .get(raw_index)
            .map_err(|e| page_err(format!("{:?}", e)))?;

        let width = page.width().value;
        let height = page.height().value;
        let flip = |left: f32, top: f32, right: f32, bottom: f32| {
            Rect::new(left, height - top, right, height - bottom)
        };

        let text = page.text().map_err(|e| page_err(format!("{:?}", e)))?;
        let spans: Vec<TextSpan> = text
            .segments()
            .iter()
            .filter_map(|segment| {
                let content = segment.text();
                if content.trim().is_empty() {
                    return None;
                }
                let b = segment.bounds();
                Some(TextSpan::new(
                    flip(b.left().value, b.top().value, b.right().value, b.bottom().value),
                    content,
                ))
            })
            .collect();

        let chars: Vec<Char> = text
            .chars()
            .iter()
            .filter_map(|c| {
                let glyph = c.unicode_char().filter(|g| !g.is_whitespace())?;
                let b = c.tight_bounds().ok()?;
                Some(layout::page_char(
                    glyph,
                    &flip(b.left().value, b.top().value, b.right().value, b.bottom().value),
                ))
            })
            .collect();

        let edges: Vec<Edge> = page
            .objects()
            .iter()
            .flat_map(|object| path_edges(&object, height))
            .collect();

        debug!(
            "Page {}: {} text spans, {} chars, {} ruling edges",
            index + 1,
            spans.len(),
            chars.len(),
            edges.len()
        );

        Ok(PdfiumPage {
            rect: Rect::new(0.0, 0.0, width, height),
            spans,
            chars,
            edges,
        })
    }

    fn extract_page(&self, index: usize) -> Result<Vec<u8>, EngineError> {
        let extract_err = |detail: String| EngineError::Extract {
            page: index + 1,
            detail,
        };
        let raw_index = u16::try_from(index).map_err(|e| extract_err(e.to_string()))?;

        let mut single = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| extract_err(format!("{:?}", e)))?;
        single
            .pages_mut()
            .copy_page_from_document(&self.document, raw_index, 0)
            .map_err(|e| extract_err(format!("{:?}", e)))?;
        single
            .save_to_bytes()
            .map_err(|e| extract_err(format!("{:?}", e)))
    }
}

/// Ruling edges drawn by a path object, in top-left coordinates.
///
/// Each straight segment becomes its own edge so grids stroked as one path
/// keep their interior rules. A path whose segments pdfium cannot report
/// falls back to its bounding box.
fn path_edges(object: &PdfPageObject, height: f32) -> Vec<Edge> {
    let Some(path) = object.as_path_object() else {
        return Vec::new();
    };

    let mut ops = Vec::new();
    for segment in path.segments().iter() {
        let (x, y) = (segment.x().value, height - segment.y().value);
        ops.push(match segment.segment_type() {
            PdfPathSegmentType::MoveTo => PathOp::MoveTo(x, y),
            PdfPathSegmentType::LineTo => PathOp::LineTo(x, y),
            _ => PathOp::CurveTo(x, y),
        });
        if segment.is_close() {
            ops.push(PathOp::Close);
        }
    }
    if !ops.is_empty() {
        return layout::edges_from_path(&ops);
    }

    match object.bounds() {
        Ok(b) => layout::edges_from_rect(&Rect::new(
            b.left().value,
            height - b.top().value,
            b.right().value,
            height - b.bottom().value,
        )),
        Err(_) => Vec::new(),
    }
}

/// Page geometry read out of pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumPage {
    rect: Rect,
    spans: Vec<TextSpan>,
    chars: Vec<Char>,
    edges: Vec<Edge>,
}

impl PdfPage for PdfiumPage {
    fn rect(&self) -> Rect {
        self.rect
    }

    fn find_tables(
        &self,
        region: &Rect,
        strategy: TableStrategy,
    ) -> Result<Vec<TableRegion>, EngineError> {
        Ok(layout::find_tables(&self.chars, &self.edges, region, strategy))
    }

    fn text_blocks(&self, region: &Rect) -> Result<Vec<TextBlock>, EngineError> {
        Ok(layout::text_blocks(&self.spans, region))
    }
}
