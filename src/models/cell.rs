//! Raw cell values as read from CSV files, workbooks and injected feeds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single raw spreadsheet value.
///
/// Cells keep the loosest type the source gave us. CSV cells are always
/// [`Cell::Text`]; workbook cells keep their native numeric, boolean and
/// date/time encodings so the normalizer can interpret them.
///
/// # Example
///
/// ```
/// use fleet_etl::models::Cell;
///
/// assert!(Cell::from_text("   ").is_empty());
/// assert_eq!(Cell::Number(12.0).to_string(), "12");
/// assert_eq!(Cell::from_text(" EX-1 ").to_string(), "EX-1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    /// No value.
    Empty,
    /// Free text.
    Text(String),
    /// A numeric value.
    Number(f64),
    /// A boolean value.
    Bool(bool),
    /// An Excel date/time serial (days since 1899-12-30, fraction = time of day).
    DateTime(f64),
    /// An Excel duration serial (days, fraction included).
    Duration(f64),
    /// A spreadsheet error value such as `#DIV/0!`.
    Error(String),
}

impl Cell {
    /// Builds a cell from text, trimming whitespace and mapping blanks to [`Cell::Empty`].
    pub fn from_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    /// Builds a cell from a JSON value delivered by an injected record source.
    ///
    /// # Example
    ///
    /// ```
    /// use fleet_etl::models::Cell;
    /// use serde_json::json;
    ///
    /// assert_eq!(Cell::from_json(&json!(0.5)), Cell::Number(0.5));
    /// assert_eq!(Cell::from_json(&json!(null)), Cell::Empty);
    /// assert_eq!(Cell::from_json(&json!("JOBA")), Cell::Text("JOBA".to_string()));
    /// ```
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Empty,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            serde_json::Value::String(s) => Cell::from_text(s),
            other => Cell::from_text(&other.to_string()),
        }
    }

    /// Returns true when the cell carries no usable content.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the trimmed display text, or `None` for empty cells.
    pub fn text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string().trim().to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Number(n) | Cell::DateTime(n) | Cell::Duration(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Error(e) => write!(f, "{}", e),
        }
    }
}
