//! Page-geometry glue between the pdfium adapter and `pdfplumber-core`.
//!
//! Nothing here touches pdfium. The adapter reads characters, text spans
//! and path segments once per page and converts them with the helpers
//! below; table detection is delegated to [`pdfplumber_core::TableFinder`]
//! and text-block grouping is plain arithmetic over spans.
//!
//! ## Table finding
//!
//! ```text
//! chars ─▶ words ─┐
//!                 ├─▶ TableFinder ─▶ tables ─▶ cell text ─▶ TableRegion
//! path ─▶ edges ──┘
//! ```
//!
//! `Lines` runs the lattice strategy over drawn ruling edges. `Text` runs
//! the stream strategy, which synthesises edges from word alignment.

use super::{Rect, TableRegion, TableStrategy, TextBlock};
use pdfplumber_core::{
    extract_text_for_cells, BBox, Char, Edge, EdgeSource, Orientation, Strategy, Table,
    TableFinder, TableSettings, TextDirection, WordExtractor, WordOptions,
};
use std::cmp::Ordering;

/// Paths thinner than this are treated as ruling lines.
const LINE_THICKNESS: f32 = 2.0;

/// A segment whose ends differ by no more than this across its axis still
/// counts as straight.
const SKEW_TOLERANCE: f32 = 1.0;

/// Table cells are matched to columns by left edge within this distance.
const COLUMN_EPSILON: f64 = 1e-6;

/// Vertical gap, relative to line height, that still joins two lines into a
/// single block.
const BLOCK_GAP_RATIO: f32 = 0.8;

// ── Inputs ───────────────────────────────────────────────────────────────

/// A run of text with its bounding box, as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub bbox: Rect,
    pub text: String,
}

impl TextSpan {
    pub fn new(bbox: Rect, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
        }
    }
}

/// One drawing operation of a path, in top-left page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathOp {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    /// A curve ending at the given point. Curves never become rulings.
    CurveTo(f32, f32),
    /// Close the current subpath back to its starting point.
    Close,
}

/// Ruling edges drawn by a path, one per straight axis-aligned segment.
///
/// A grid stroked as a single path yields its interior rules as well as its
/// border. Closed subpaths (`re` rectangles) contribute the closing side.
/// Diagonal segments and curves are skipped.
pub fn edges_from_path(ops: &[PathOp]) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut start: Option<(f32, f32)> = None;
    let mut current: Option<(f32, f32)> = None;

    for op in ops {
        match *op {
            PathOp::MoveTo(x, y) => {
                start = Some((x, y));
                current = start;
            }
            PathOp::LineTo(x, y) => {
                match current {
                    Some(from) => edges.extend(straight_edge(from, (x, y))),
                    None => start = Some((x, y)),
                }
                current = Some((x, y));
            }
            PathOp::CurveTo(x, y) => {
                if current.is_none() {
                    start = Some((x, y));
                }
                current = Some((x, y));
            }
            PathOp::Close => {
                if let (Some(from), Some(to)) = (current, start) {
                    edges.extend(straight_edge(from, to));
                }
                current = start;
            }
        }
    }
    edges
}

fn straight_edge((ax, ay): (f32, f32), (bx, by): (f32, f32)) -> Option<Edge> {
    let (dx, dy) = ((ax - bx).abs(), (ay - by).abs());
    if dy <= SKEW_TOLERANCE && dx > SKEW_TOLERANCE {
        Some(horizontal((ay + by) / 2.0, ax, bx, EdgeSource::Line))
    } else if dx <= SKEW_TOLERANCE && dy > SKEW_TOLERANCE {
        Some(vertical((ax + bx) / 2.0, ay, by, EdgeSource::Line))
    } else {
        None
    }
}

/// Edges implied by a path's bounding box, for paths whose segments
/// cannot be read.
///
/// Thin boxes are single lines; anything larger contributes its four sides.
pub fn edges_from_rect(bbox: &Rect) -> Vec<Edge> {
    let (w, h) = (bbox.width(), bbox.height());
    let (cx, cy) = bbox.center();
    match (w > LINE_THICKNESS, h > LINE_THICKNESS) {
        (true, false) => vec![horizontal(cy, bbox.x0, bbox.x1, EdgeSource::Line)],
        (false, true) => vec![vertical(cx, bbox.y0, bbox.y1, EdgeSource::Line)],
        (false, false) => Vec::new(),
        (true, true) => vec![
            horizontal(bbox.y0, bbox.x0, bbox.x1, EdgeSource::RectTop),
            horizontal(bbox.y1, bbox.x0, bbox.x1, EdgeSource::RectBottom),
            vertical(bbox.x0, bbox.y0, bbox.y1, EdgeSource::RectLeft),
            vertical(bbox.x1, bbox.y0, bbox.y1, EdgeSource::RectRight),
        ],
    }
}

fn horizontal(y: f32, x0: f32, x1: f32, source: EdgeSource) -> Edge {
    let y = f64::from(y);
    Edge {
        x0: f64::from(x0.min(x1)),
        top: y,
        x1: f64::from(x0.max(x1)),
        bottom: y,
        orientation: Orientation::Horizontal,
        source,
    }
}

fn vertical(x: f32, y0: f32, y1: f32, source: EdgeSource) -> Edge {
    let x = f64::from(x);
    Edge {
        x0: x,
        top: f64::from(y0.min(y1)),
        x1: x,
        bottom: f64::from(y0.max(y1)),
        orientation: Orientation::Vertical,
        source,
    }
}

/// A single glyph for word and cell-text extraction.
pub fn page_char(c: char, bbox: &Rect) -> Char {
    Char {
        text: c.to_string(),
        bbox: to_bbox(bbox),
        fontname: String::new(),
        size: f64::from(bbox.height()),
        doctop: f64::from(bbox.y0),
        upright: true,
        direction: TextDirection::Ltr,
        stroking_color: None,
        non_stroking_color: None,
        ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        char_code: u32::from(c),
        mcid: None,
        tag: None,
    }
}

// ── Table finding ────────────────────────────────────────────────────────

/// Find tables in `region` using the given strategy.
///
/// Tables are returned top to bottom, then left to right. A grid needs at
/// least two cells to count as a table.
pub fn find_tables(
    chars: &[Char],
    edges: &[Edge],
    region: &Rect,
    strategy: TableStrategy,
) -> Vec<TableRegion> {
    let area = to_bbox(region);
    let chars: Vec<Char> = chars
        .iter()
        .filter(|c| centre_in(&c.bbox, &area))
        .cloned()
        .collect();
    let edges: Vec<Edge> = match strategy {
        TableStrategy::Lines { .. } => edges.iter().filter_map(|e| crop_edge(e, &area)).collect(),
        TableStrategy::Text { .. } => Vec::new(),
    };
    let words = WordExtractor::extract(&chars, &WordOptions::default());

    TableFinder::new_with_words(edges, words, table_settings(strategy))
        .find_tables()
        .into_iter()
        .filter(|table| table.cells.len() > 1)
        .map(|mut table| {
            for row in &mut table.rows {
                extract_text_for_cells(row, &chars);
            }
            to_region(&table)
        })
        .collect()
}

fn table_settings(strategy: TableStrategy) -> TableSettings {
    let (strategy, snap) = match strategy {
        TableStrategy::Lines { snap_tolerance } => (Strategy::Lattice, snap_tolerance),
        TableStrategy::Text { snap_tolerance } => (Strategy::Stream, snap_tolerance),
    };
    let snap = f64::from(snap);
    TableSettings {
        strategy,
        snap_tolerance: snap,
        snap_x_tolerance: snap,
        snap_y_tolerance: snap,
        ..TableSettings::default()
    }
}

/// The part of `edge` inside `area`, if any.
fn crop_edge(edge: &Edge, area: &BBox) -> Option<Edge> {
    let x0 = edge.x0.max(area.x0);
    let x1 = edge.x1.min(area.x1);
    let top = edge.top.max(area.top);
    let bottom = edge.bottom.min(area.bottom);
    let keep = match edge.orientation {
        Orientation::Horizontal => x0 < x1 && edge.top >= area.top && edge.top <= area.bottom,
        Orientation::Vertical => top < bottom && edge.x0 >= area.x0 && edge.x0 <= area.x1,
        _ => false,
    };
    keep.then(|| Edge {
        x0,
        top,
        x1,
        bottom,
        orientation: edge.orientation,
        source: edge.source,
    })
}

/// Lay a detected table out as a dense row-major grid.
///
/// Columns are the distinct left edges across all cells. A row with no cell
/// starting at a column gets `None` there; a cell without text is `""`.
fn to_region(table: &Table) -> TableRegion {
    let mut columns: Vec<f64> = table.cells.iter().map(|c| c.bbox.x0).collect();
    columns.sort_by(f64::total_cmp);
    columns.dedup_by(|a, b| (*a - *b).abs() < COLUMN_EPSILON);

    let cells = table
        .rows
        .iter()
        .map(|row| {
            let mut out = vec![None; columns.len()];
            for cell in row {
                if let Some(i) = columns
                    .iter()
                    .position(|x| (x - cell.bbox.x0).abs() < COLUMN_EPSILON)
                {
                    out[i] = Some(cell.text.clone().unwrap_or_default());
                }
            }
            out
        })
        .collect();

    TableRegion {
        bbox: to_rect(&table.bbox),
        cells,
    }
}

fn span_in(span: &TextSpan, region: &Rect) -> bool {
    let (cx, cy) = span.bbox.center();
    region.contains_point(cx, cy)
}

fn centre_in(bbox: &BBox, area: &BBox) -> bool {
    let cx = (bbox.x0 + bbox.x1) / 2.0;
    let cy = (bbox.top + bbox.bottom) / 2.0;
    cx >= area.x0 && cx <= area.x1 && cy >= area.top && cy <= area.bottom
}

fn to_bbox(rect: &Rect) -> BBox {
    BBox::new(
        f64::from(rect.x0),
        f64::from(rect.y0),
        f64::from(rect.x1),
        f64::from(rect.y1),
    )
}

fn to_rect(bbox: &BBox) -> Rect {
    Rect::new(
        bbox.x0 as f32,
        bbox.top as f32,
        bbox.x1 as f32,
        bbox.bottom as f32,
    )
}

// ── Text blocks ──────────────────────────────────────────────────────────

/// Group spans whose centre lies in `region` into text blocks.
///
/// Spans that overlap vertically form a line; consecutive lines separated by
/// less than [`BLOCK_GAP_RATIO`] of a line height and overlapping
/// horizontally form a block. Lines in a block are joined with `\n`.
pub fn text_blocks(spans: &[TextSpan], region: &Rect) -> Vec<TextBlock> {
    let inside: Vec<&TextSpan> = spans
        .iter()
        .filter(|s| span_in(s, region) && !s.text.trim().is_empty())
        .collect();

    let mut blocks: Vec<TextBlock> = Vec::new();
    for line in group_lines(&inside) {
        match blocks.last_mut() {
            Some(block) if continues_block(&block.bbox, &line.bbox) => {
                block.bbox = block.bbox.union(&line.bbox);
                block.text.push('\n');
                block.text.push_str(&line.text);
            }
            _ => blocks.push(line),
        }
    }
    blocks
}

fn continues_block(block: &Rect, line: &Rect) -> bool {
    let gap = line.y0 - block.y1;
    let overlaps_x = line.x0 < block.x1 && block.x0 < line.x1;
    gap < line.height() * BLOCK_GAP_RATIO && overlaps_x
}

/// Join spans into lines in reading order.
fn group_lines(spans: &[&TextSpan]) -> Vec<TextBlock> {
    let mut sorted: Vec<&TextSpan> = spans.to_vec();
    sorted.sort_by(|a, b| cmp_f32(a.bbox.y0, b.bbox.y0).then(cmp_f32(a.bbox.x0, b.bbox.x0)));

    let mut lines: Vec<(Rect, Vec<&TextSpan>)> = Vec::new();
    for span in sorted {
        match lines.last_mut() {
            Some((bbox, members)) if same_line(bbox, &span.bbox) => {
                *bbox = bbox.union(&span.bbox);
                members.push(span);
            }
            _ => lines.push((span.bbox, vec![span])),
        }
    }

    lines
        .into_iter()
        .map(|(bbox, mut members)| {
            members.sort_by(|a, b| cmp_f32(a.bbox.x0, b.bbox.x0));
            let text = members
                .iter()
                .map(|s| s.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            TextBlock { bbox, text }
        })
        .collect()
}

/// Spans share a line when they overlap by at least half the shorter height.
fn same_line(line: &Rect, span: &Rect) -> bool {
    let overlap = line.y1.min(span.y1) - line.y0.max(span.y0);
    let shorter = line.height().min(span.height());
    if shorter <= 0.0 {
        return (line.y0 - span.y0).abs() < f32::EPSILON;
    }
    overlap >= shorter * 0.5
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.total_cmp(&b)
}
