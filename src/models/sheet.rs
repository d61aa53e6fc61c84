//! Sheet models: the raw grid a loader produces and the sniffed [`RawSheet`].

use serde::{Deserialize, Serialize};

use super::Cell;

static EMPTY_CELL: Cell = Cell::Empty;

/// The unsniffed contents of one worksheet or CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    /// The sheet name (file stem for CSV input).
    pub name: String,
    /// The 1-based source line of `rows[0]`.
    pub first_line: usize,
    /// Rows of cells in source order, blank rows included.
    pub rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    /// Creates a grid whose first row is source line 1.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            first_line: 1,
            rows,
        }
    }

    /// Returns true if no cell in the grid carries content.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(Cell::is_empty))
    }
}

/// How the header row of a [`RawSheet`] was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderConfidence {
    /// A row scored above the sniffing threshold.
    Detected,
    /// No row qualified; row 0 was used as a fallback.
    LowConfidence,
}

/// One data row of a [`RawSheet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    /// The 1-based line in the source file.
    pub line: usize,
    /// The row's cells, positionally aligned with the sheet headers.
    pub cells: Vec<Cell>,
}

impl SheetRow {
    /// Returns the cell at `column`, or an empty cell past the end of the row.
    pub fn get(&self, column: usize) -> &Cell {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// Returns true if every cell in the row is empty.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// A sheet whose header row has been located.
///
/// Each row maps header labels to raw values positionally. Content is
/// unvalidated: rows may be blank, short, or carry inconsistent types.
///
/// # Example
///
/// ```
/// use fleet_etl::models::{Cell, HeaderConfidence, RawSheet, SheetRow};
///
/// let sheet = RawSheet {
///     origin: "billing.csv".to_string(),
///     name: "billing".to_string(),
///     headers: vec!["Equip #".to_string(), "Units".to_string()],
///     header_line: 1,
///     confidence: HeaderConfidence::Detected,
///     rows: vec![SheetRow { line: 2, cells: vec![Cell::from_text("EX-1"), Cell::from_text("0.7")] }],
/// };
/// assert_eq!(sheet.value(0, "Units"), Some(&Cell::Text("0.7".to_string())));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSheet {
    /// The file path or record source this sheet came from.
    pub origin: String,
    /// The sheet name.
    pub name: String,
    /// Header labels in column order.
    pub headers: Vec<String>,
    /// The 1-based source line of the header row.
    pub header_line: usize,
    /// How the header row was chosen.
    pub confidence: HeaderConfidence,
    /// Data rows following the header.
    pub rows: Vec<SheetRow>,
}

impl RawSheet {
    /// Looks up a cell by data row index and header label.
    pub fn value(&self, row: usize, label: &str) -> Option<&Cell> {
        let column = self.headers.iter().position(|h| h == label)?;
        self.rows.get(row).map(|r| r.get(column))
    }

    /// Number of data rows that carry any content.
    pub fn data_row_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_blank()).count()
    }

    /// Rebuilds the detected region (header followed by data rows) as a plain grid.
    pub fn region(&self) -> Vec<Vec<Cell>> {
        let header = self.headers.iter().map(|h| Cell::from_text(h)).collect();
        std::iter::once(header)
            .chain(self.rows.iter().map(|r| r.cells.clone()))
            .collect()
    }
}
