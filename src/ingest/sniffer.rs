//! Header sniffing.
//!
//! Human-authored spreadsheets often open with titles, blank separators or
//! merged banner rows. This module scores the leading rows of a sheet and
//! picks the first one that looks like a column header.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SnifferConfig;
use crate::models::{Cell, HeaderConfidence, RawSheet, SheetGrid, SheetRow};
use crate::processing::excel_serial_to_date;

/// Points awarded when a row mentions an indicator keyword.
pub const INDICATOR_BONUS: u32 = 3;

/// Points awarded when a row's cells are short, as header labels tend to be.
pub const SHORT_TEXT_BONUS: u32 = 2;

/// The score breakdown for one candidate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowScore {
    /// Index of the row within the scanned rows.
    pub row: usize,
    /// Number of non-empty cells.
    pub non_empty: usize,
    /// Whether any indicator keyword occurs in the row text.
    pub indicator_hit: bool,
    /// Whether the average non-empty cell is short.
    pub short_cells: bool,
    /// The total score; zero for rows below the minimum cell count.
    pub score: u32,
}

/// The outcome of looking for a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HeaderDetection {
    /// A row scored above the threshold.
    Found {
        /// Index of the header row.
        row: usize,
        /// Its score.
        score: u32,
    },
    /// No row qualified within the scan window; row 0 is used.
    Fallback,
    /// The sheet has no content at all.
    NoDataRegion,
}

impl HeaderDetection {
    /// The header row index, if a data region exists.
    pub fn header_row(&self) -> Option<usize> {
        match self {
            HeaderDetection::Found { row, .. } => Some(*row),
            HeaderDetection::Fallback => Some(0),
            HeaderDetection::NoDataRegion => None,
        }
    }
}

/// The result of sniffing a whole sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SniffOutcome {
    /// The data region was located.
    Located(RawSheet),
    /// The sheet is empty; callers should skip it.
    NoDataRegion,
}

/// Scores one row as a header candidate.
///
/// The score is the number of non-empty cells, plus [`INDICATOR_BONUS`] if
/// any configured indicator occurs in the row text (case-insensitive), plus
/// [`SHORT_TEXT_BONUS`] if the average non-empty cell is at most
/// `max_average_cell_len` characters. Rows with fewer than `min_cells`
/// non-empty cells score zero.
///
/// # Example
///
/// ```
/// use fleet_etl::config::SnifferConfig;
/// use fleet_etl::ingest::score_row;
/// use fleet_etl::models::Cell;
///
/// let config = SnifferConfig::default();
/// let header: Vec<Cell> = ["Equip #", "Job", "Units", "Rate"].iter().map(|s| Cell::from_text(s)).collect();
/// let score = score_row(0, &header, &config);
/// assert_eq!(score.score, 4 + 3 + 2);
///
/// let title = vec![Cell::from_text("Equipment Billing Report - March")];
/// assert_eq!(score_row(0, &title, &config).score, 0);
/// ```
pub fn score_row(row: usize, cells: &[Cell], config: &SnifferConfig) -> RowScore {
    let texts: Vec<String> = cells.iter().filter_map(Cell::text).collect();
    let non_empty = texts.len();

    let row_text = texts.join(" ").to_lowercase();
    let indicator_hit = config
        .indicators
        .iter()
        .map(|i| i.trim().to_lowercase())
        .any(|i| !i.is_empty() && row_text.contains(&i));

    let total_len: usize = texts.iter().map(|t| t.chars().count()).sum();
    let short_cells = non_empty > 0 && total_len <= config.max_average_cell_len * non_empty;

    let score = if non_empty < config.min_cells.max(1) {
        0
    } else {
        non_empty as u32
            + if indicator_hit { INDICATOR_BONUS } else { 0 }
            + if short_cells { SHORT_TEXT_BONUS } else { 0 }
    };

    RowScore {
        row,
        non_empty,
        indicator_hit,
        short_cells,
        score,
    }
}

/// Finds the header row among the leading rows of a sheet.
///
/// Picks the first row within `max_scan_rows` whose score exceeds
/// `score_threshold`. If none does, falls back to row 0. Returns
/// [`HeaderDetection::NoDataRegion`] when no cell of the sheet has content.
pub fn detect_header(rows: &[Vec<Cell>], config: &SnifferConfig) -> HeaderDetection {
    if rows.iter().all(|r| r.iter().all(Cell::is_empty)) {
        return HeaderDetection::NoDataRegion;
    }

    for (index, cells) in rows.iter().take(config.max_scan_rows).enumerate() {
        let score = score_row(index, cells, config);
        if score.score > config.score_threshold {
            debug!(row = index, score = score.score, "Header row detected");
            return HeaderDetection::Found {
                row: index,
                score: score.score,
            };
        }
    }

    HeaderDetection::Fallback
}

/// Locates the data region of a sheet and splits it into headers and rows.
///
/// # Example
///
/// ```
/// use fleet_etl::config::SnifferConfig;
/// use fleet_etl::ingest::{sniff_sheet, SniffOutcome};
/// use fleet_etl::models::{Cell, SheetGrid};
///
/// let grid = SheetGrid::new("billing", vec![
///     vec![Cell::from_text("Equipment Billing - March")],
///     vec![],
///     ["Equip #", "Job", "Units", "Rate"].iter().map(|s| Cell::from_text(s)).collect(),
///     ["EX-1", "JOBA", "0.7", "100"].iter().map(|s| Cell::from_text(s)).collect(),
/// ]);
///
/// match sniff_sheet(&grid, "billing.csv", &SnifferConfig::default()) {
///     SniffOutcome::Located(sheet) => {
///         assert_eq!(sheet.header_line, 3);
///         assert_eq!(sheet.headers[0], "Equip #");
///         assert_eq!(sheet.rows.len(), 1);
///     }
///     SniffOutcome::NoDataRegion => panic!("expected a data region"),
/// }
/// ```
pub fn sniff_sheet(grid: &SheetGrid, origin: &str, config: &SnifferConfig) -> SniffOutcome {
    let detection = detect_header(&grid.rows, config);
    let Some(header_row) = detection.header_row() else {
        return SniffOutcome::NoDataRegion;
    };

    let confidence = match detection {
        HeaderDetection::Found { .. } => HeaderConfidence::Detected,
        _ => {
            warn!(
                origin,
                sheet = %grid.name,
                scanned = config.max_scan_rows,
                "No header row crossed the threshold; using row 0"
            );
            HeaderConfidence::LowConfidence
        }
    };

    let headers = grid.rows[header_row].iter().map(header_label).collect();

    let rows = grid.rows[header_row + 1..]
        .iter()
        .enumerate()
        .map(|(offset, cells)| SheetRow {
            line: grid.first_line + header_row + 1 + offset,
            cells: cells.clone(),
        })
        .collect();

    SniffOutcome::Located(RawSheet {
        origin: origin.to_string(),
        name: grid.name.clone(),
        headers,
        header_line: grid.first_line + header_row,
        confidence,
        rows,
    })
}

/// Renders a header cell as a label; date-typed cells become `YYYY-MM-DD`.
fn header_label(cell: &Cell) -> String {
    match cell {
        Cell::DateTime(serial) => match excel_serial_to_date(*serial) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => cell.text().unwrap_or_default(),
        },
        _ => cell.text().unwrap_or_default(),
    }
}
