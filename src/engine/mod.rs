//! PDF engine capability.
//!
//! The page pipeline never talks to a PDF library directly. It asks an
//! engine to open bytes, count and fetch pages, produce a self-contained
//! copy of one page, and report table and text-block geometry inside a
//! region. [`pdfium::PdfiumEngine`] is the production implementation.
//!
//! ## Why generic associated types?
//!
//! A pdfium document borrows both the bound library and the input bytes, and
//! a page borrows its document. GATs let each implementation expose those
//! borrows as-is instead of forcing every engine behind `Box<dyn ...>` with
//! `'static` data.
//!
//! All coordinates are in PDF points with a **top-left** origin, so sorting
//! by `y0` yields reading order.

pub mod layout;
pub mod pdfium;

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

pub use self::pdfium::PdfiumEngine;

// ── Traits ───────────────────────────────────────────────────────────────

/// Opens PDF byte buffers. Shared by every worker, hence `Send + Sync`.
pub trait PdfEngine: Send + Sync + 'static {
    type Document<'a>: PdfDocument
    where
        Self: 'a;

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Self::Document<'a>, EngineError>;
}

/// An opened document.
pub trait PdfDocument {
    type Page<'p>: PdfPage
    where
        Self: 'p;

    fn page_count(&self) -> usize;

    /// Load the page at a 0-based index.
    fn page(&self, index: usize) -> Result<Self::Page<'_>, EngineError>;

    /// Serialise page `index` alone into a new, self-contained PDF.
    fn extract_page(&self, index: usize) -> Result<Vec<u8>, EngineError>;
}

/// A loaded page.
pub trait PdfPage {
    /// Full page rectangle.
    fn rect(&self) -> Rect;

    /// Detect table grids inside `region`.
    fn find_tables(
        &self,
        region: &Rect,
        strategy: TableStrategy,
    ) -> Result<Vec<TableRegion>, EngineError>;

    /// Raw text blocks clipped to `region`, in no particular order.
    fn text_blocks(&self, region: &Rect) -> Result<Vec<TextBlock>, EngineError>;
}

// ── Geometry ─────────────────────────────────────────────────────────────

/// Axis-aligned rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// True when the two rectangles share a region of positive area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Shrink by `dx` on the left and right and `dy` on the top and bottom.
    pub fn inset(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x0 + dx, self.y0 + dy, self.x1 - dx, self.y1 - dy)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }
}

// ── Extraction results ───────────────────────────────────────────────────

/// How tables are located on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableStrategy {
    /// Use drawn ruling lines. Parallel lines closer than `snap_tolerance`
    /// points are merged.
    Lines { snap_tolerance: f32 },

    /// Infer column and row boundaries from word alignment.
    Text { snap_tolerance: f32 },
}

impl TableStrategy {
    pub fn snap_tolerance(&self) -> f32 {
        match self {
            TableStrategy::Lines { snap_tolerance } | TableStrategy::Text { snap_tolerance } => {
                *snap_tolerance
            }
        }
    }
}

/// A detected table grid.
///
/// `cells[row][col]` is `None` where the grid has no cell (merged or
/// missing), and `Some` (possibly empty) where a cell exists.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub bbox: Rect,
    pub cells: Vec<Vec<Option<String>>>,
}

/// A run of text the engine considers one block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub bbox: Rect,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.0, 9.0, 12.0, 12.0)));
    }

    #[test]
    fn test_inset_keeps_horizontal_extent() {
        let page = Rect::new(0.0, 0.0, 612.0, 792.0);
        let region = page.inset(0.0, 40.0);
        assert_eq!(region, Rect::new(0.0, 40.0, 612.0, 752.0));
        assert!(!region.is_empty());
        assert!(page.inset(0.0, 400.0).is_empty());
    }

    #[test]
    fn test_union_and_center() {
        let u = Rect::new(0.0, 0.0, 2.0, 2.0).union(&Rect::new(4.0, 1.0, 6.0, 8.0));
        assert_eq!(u, Rect::new(0.0, 0.0, 6.0, 8.0));
        assert_eq!(u.center(), (3.0, 4.0));
        assert!(u.contains_point(6.0, 8.0));
    }
}
