//! Table extraction: detect grids, render them to Markdown, drop false
//! positives.
//!
//! ## Why validate detected tables?
//!
//! The text-alignment fallback happily reads a column of justified prose as a
//! one-column table. Real tables in the documents this service targets carry
//! numbers, so a long rendered table with almost no digits is treated as
//! mis-segmented prose and discarded.

use crate::engine::{PdfPage, Rect, TableRegion, TableStrategy};
use crate::error::EngineError;
use tracing::debug;

/// Ruling-line detection, tried first.
pub const LINES_STRATEGY: TableStrategy = TableStrategy::Lines { snap_tolerance: 3.0 };

/// Text-alignment detection, used only when no ruled table is found.
pub const TEXT_STRATEGY: TableStrategy = TableStrategy::Text { snap_tolerance: 4.0 };

/// Residues shorter than this are always accepted.
const MAX_PLAIN_RESIDUE: usize = 200;

/// Residues with more digits than this are always accepted.
const DIGIT_THRESHOLD: usize = 5;

/// An accepted table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    pub markdown: String,
    pub bbox: Rect,
}

/// Detect, render and validate the tables inside `region`.
///
/// Output follows detection order. Rejected tables are dropped silently.
pub fn extract_tables<P: PdfPage>(
    page: &P,
    region: &Rect,
) -> Result<Vec<ExtractedTable>, EngineError> {
    let mut found = page.find_tables(region, LINES_STRATEGY)?;
    if found.is_empty() {
        found = page.find_tables(region, TEXT_STRATEGY)?;
    }

    Ok(found
        .iter()
        .filter_map(|table| {
            let markdown = render_table(table)?;
            if is_plausible_table(&markdown) {
                Some(ExtractedTable {
                    markdown,
                    bbox: table.bbox,
                })
            } else {
                debug!("Discarding table at {:?}: looks like prose", table.bbox);
                None
            }
        })
        .collect())
}

/// Render a detected grid as a GFM table.
///
/// Columns blank in every row are dropped, as are rows left with no content.
/// The first remaining row is the header. Returns `None` when nothing is left.
pub fn render_table(table: &TableRegion) -> Option<String> {
    let width = table.cells.iter().map(Vec::len).max().unwrap_or(0);
    let columns: Vec<usize> = (0..width)
        .filter(|&col| table.cells.iter().any(|row| !cell(row, col).is_empty()))
        .collect();
    if columns.is_empty() {
        return None;
    }

    let rows: Vec<Vec<String>> = table
        .cells
        .iter()
        .map(|row| columns.iter().map(|&col| cell(row, col)).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!("| {} |", row.join(" | ")));
        if i == 0 {
            lines.push(format!("| {} |", vec!["---"; columns.len()].join(" | ")));
        }
    }
    Some(lines.join("\n"))
}

fn cell(row: &[Option<String>], col: usize) -> String {
    row.get(col)
        .and_then(Option::as_deref)
        .map(|text| text.replace('\n', " ").trim().to_string())
        .unwrap_or_default()
}

/// Digit/length heuristic separating real tables from mis-detected prose.
///
/// The table is measured one row per line, each ending in `\n`. Pipes and
/// dashes are stripped first so the table scaffolding does not count
/// towards the length. Digits are any Unicode numeric characters.
pub fn is_plausible_table(markdown: &str) -> bool {
    let residue: String = markdown
        .lines()
        .flat_map(|line| line.chars().chain(std::iter::once('\n')))
        .filter(|c| *c != '|' && *c != '-')
        .collect();
    let digits = residue.chars().filter(|c| c.is_numeric()).count();
    digits > DIGIT_THRESHOLD || residue.chars().count() < MAX_PLAIN_RESIDUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TextBlock;
    use std::cell::RefCell;

    fn cells(rows: &[&[&str]]) -> Vec<Vec<Option<String>>> {
        rows.iter()
            .map(|r| r.iter().map(|c| Some(c.to_string())).collect())
            .collect()
    }

    fn table(rows: &[&[&str]]) -> TableRegion {
        TableRegion {
            bbox: Rect::new(0.0, 0.0, 100.0, 100.0),
            cells: cells(rows),
        }
    }

    /// Page double that answers table queries per strategy.
    struct ScriptedPage {
        lines: Vec<TableRegion>,
        text: Vec<TableRegion>,
        asked: RefCell<Vec<TableStrategy>>,
    }

    impl PdfPage for ScriptedPage {
        fn rect(&self) -> Rect {
            Rect::new(0.0, 0.0, 600.0, 800.0)
        }

        fn find_tables(
            &self,
            _region: &Rect,
            strategy: TableStrategy,
        ) -> Result<Vec<TableRegion>, EngineError> {
            self.asked.borrow_mut().push(strategy);
            Ok(match strategy {
                TableStrategy::Lines { .. } => self.lines.clone(),
                TableStrategy::Text { .. } => self.text.clone(),
            })
        }

        fn text_blocks(&self, _region: &Rect) -> Result<Vec<TextBlock>, EngineError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_render_header_separator_and_rows() {
        let md = render_table(&table(&[&["Item", "Qty"], &["bolt", "12"], &["nut", "7"]]));
        assert_eq!(
            md.as_deref(),
            Some("| Item | Qty |\n| --- | --- |\n| bolt | 12 |\n| nut | 7 |")
        );
    }

    #[test]
    fn test_blank_column_dropped_everywhere() {
        let md = render_table(&table(&[&["A", " ", "B"], &["1", "", "2"]])).unwrap();
        assert_eq!(md, "| A | B |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn test_blank_rows_skipped_and_newlines_flattened() {
        let mut t = table(&[&["", ""], &["Name", "Unit\nprice"], &["x", "1"]]);
        t.cells[2][1] = None;
        let md = render_table(&t).unwrap();
        assert_eq!(md, "| Name | Unit price |\n| --- | --- |\n| x |  |");
    }

    #[test]
    fn test_all_blank_table_renders_nothing() {
        assert_eq!(render_table(&table(&[&["", " "], &["", ""]])), None);
    }

    #[test]
    fn test_short_table_accepted() {
        assert!(is_plausible_table("| a | b |\n| --- | --- |\n| c | d |"));
    }

    /// One-column table whose rows hold `first` and `second`.
    fn one_column(first: &str, second: &str) -> String {
        let region = table(&[&[first], &[second]]);
        render_table(&region).unwrap()
    }

    #[test]
    fn test_residue_counts_each_row_terminator() {
        // " x… \n" + "  \n" + " y… \n"
        let at_limit = one_column(&"x".repeat(96), &"y".repeat(95));
        let below_limit = one_column(&"x".repeat(95), &"y".repeat(95));
        assert!(!is_plausible_table(&at_limit));
        assert!(is_plausible_table(&below_limit));
    }

    #[test]
    fn test_non_ascii_digits_count() {
        let body = format!("٠١٢٣٤٥{}", "z".repeat(240));
        let markdown = one_column("header", &body);
        assert!(markdown.chars().count() >= 250);
        assert!(is_plausible_table(&markdown));
        // Same length without the digits is prose.
        let prose = one_column("header", &"z".repeat(246));
        assert!(!is_plausible_table(&prose));
    }

    #[test]
    fn test_long_prose_table_needs_digits() {
        let prose = "x".repeat(298);
        let rejected = format!("|{prose}12|");
        let accepted = format!("|{}123456|", "x".repeat(294));
        assert_eq!(rejected.replace('|', "").chars().count(), 300);
        assert_eq!(accepted.replace('|', "").chars().count(), 300);
        assert!(!is_plausible_table(&rejected));
        assert!(is_plausible_table(&accepted));
    }

    #[test]
    fn test_text_strategy_is_fallback_only() {
        let page = ScriptedPage {
            lines: vec![table(&[&["L", "1"], &["M", "2"]])],
            text: vec![table(&[&["T", "9"]])],
            asked: RefCell::new(Vec::new()),
        };
        let found = extract_tables(&page, &page.rect()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].markdown.starts_with("| L | 1 |"));
        assert_eq!(*page.asked.borrow(), vec![LINES_STRATEGY]);
    }

    #[test]
    fn test_fallback_used_when_no_ruled_table() {
        let page = ScriptedPage {
            lines: Vec::new(),
            text: vec![table(&[&["T", "9"]])],
            asked: RefCell::new(Vec::new()),
        };
        let found = extract_tables(&page, &page.rect()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].markdown, "| T | 9 |\n| --- | --- |");
        assert_eq!(*page.asked.borrow(), vec![LINES_STRATEGY, TEXT_STRATEGY]);
    }

    #[test]
    fn test_prose_table_discarded() {
        let long = "word ".repeat(60);
        let page = ScriptedPage {
            lines: vec![table(&[&[long.as_str()], &[long.as_str()]])],
            text: Vec::new(),
            asked: RefCell::new(Vec::new()),
        };
        assert!(extract_tables(&page, &page.rect()).unwrap().is_empty());
    }
}
