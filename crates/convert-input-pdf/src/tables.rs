//! Table detection from column-aligned text lines.

use std::ops::Range;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use convert_core::document::Table;

use crate::text_builder::{Fragment, TextLine};

/// Horizontal whitespace (points) that separates two cells of a row.
pub const COLUMN_GAP: f64 = 15.0;

/// Column starts closer than this (points) belong to the same column.
const ALIGN_TOLERANCE: f64 = 10.0;

static NUMBER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]?|[A-Za-z][.)]|[ivxlcdmIVXLCDM]+[.)])$").unwrap());

const BULLETS: &[&str] = &[
    "-", "–", "—", "•", "·", "*", "○", "▪", "◦", "▸", "►", "■", "●", "□", "◆", "◇", "▶", "➤",
];

/// A table found on a page, with the range of lines it replaces.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    pub lines: Range<usize>,
    pub top: f64,
    pub table: Table,
}

/// Find runs of consecutive lines that read as table rows.
pub fn detect_tables(lines: &[TextLine], min_rows: usize, min_columns: usize) -> Vec<DetectedTable> {
    let min_rows = min_rows.max(1);
    let min_columns = min_columns.max(2);
    let rows: Vec<Vec<Fragment>> = lines.iter().map(|l| l.fragments(COLUMN_GAP)).collect();

    let mut tables = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        if rows[start].len() < min_columns {
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < rows.len()
            && rows[end].len() >= min_columns
            && columns_aligned(&rows[end - 1], &rows[end])
        {
            end += 1;
        }

        let candidate = &rows[start..end];
        if candidate.len() >= min_rows {
            let anchors = column_anchors(candidate);
            if is_list_pattern(candidate, anchors.len()) {
                debug!("Rows {}..{} look like a list, not a table", start, end);
            } else {
                debug!(
                    "Table of {} rows x {} columns at lines {}..{}",
                    candidate.len(),
                    anchors.len(),
                    start,
                    end
                );
                tables.push(DetectedTable {
                    lines: start..end,
                    top: lines[start].top(),
                    table: build_table(candidate, &anchors),
                });
            }
        }
        start = end;
    }
    tables
}

/// At least half of the columns of the wider row start within tolerance of
/// a column start in the other row.
fn columns_aligned(a: &[Fragment], b: &[Fragment]) -> bool {
    let matches = b
        .iter()
        .filter(|fb| a.iter().any(|fa| (fa.x - fb.x).abs() <= ALIGN_TOLERANCE))
        .count();
    matches * 2 >= a.len().max(b.len())
}

/// Cluster the fragment start positions of all rows into column anchors.
fn column_anchors(rows: &[Vec<Fragment>]) -> Vec<f64> {
    let mut starts: Vec<f64> = rows.iter().flatten().map(|f| f.x).collect();
    starts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut anchors: Vec<f64> = Vec::new();
    for x in starts {
        match anchors.last() {
            Some(anchor) if x - anchor <= ALIGN_TOLERANCE => {}
            _ => anchors.push(x),
        }
    }
    anchors
}

fn build_table(rows: &[Vec<Fragment>], anchors: &[f64]) -> Table {
    let cells = rows
        .iter()
        .map(|row| {
            let mut cells = vec![String::new(); anchors.len()];
            for frag in row {
                let col = anchors
                    .iter()
                    .rposition(|a| *a <= frag.x + ALIGN_TOLERANCE)
                    .unwrap_or(0);
                let cell = &mut cells[col];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(&frag.text);
            }
            cells
        })
        .collect();
    Table::new(cells)
}

fn is_bullet_marker(text: &str) -> bool {
    BULLETS.contains(&text.trim())
}

fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    !cleaned.is_empty() && NUMBER_MARKER.is_match(&cleaned)
}

/// Bullet markers in the first column of half the rows, or numbered markers
/// in a two-column layout, mean a list rather than a table.
fn is_list_pattern(rows: &[Vec<Fragment>], columns: usize) -> bool {
    if rows.is_empty() {
        return false;
    }
    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        if let Some(first) = row.first() {
            if is_bullet_marker(&first.text) {
                bullets += 1;
            } else if is_number_marker(&first.text) {
                numbers += 1;
            }
        }
    }
    let total = rows.len() as f64;
    if bullets as f64 / total >= 0.5 {
        return true;
    }
    columns == 2 && (bullets + numbers) as f64 / total >= 0.5
}
