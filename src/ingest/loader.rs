//! File loading for CSV and Excel workbooks.
//!
//! This module reads `.csv`, `.xlsx`, `.xls`, `.xlsm` (and the other formats
//! `calamine` understands) into [`SheetGrid`]s without interpreting headers.
//! Text files are decoded from UTF-8, any BOM-declared encoding, or
//! Windows-1252 as a last resort.

use std::fs;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tracing::{debug, warn};

use crate::error::{EtlError, EtlResult};
use crate::models::{Cell, SheetGrid};

/// Input file formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text.
    Csv,
    /// Any workbook format handled by `calamine`.
    Excel,
}

impl FileFormat {
    /// Determines the format from the file extension (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use fleet_etl::ingest::FileFormat;
    ///
    /// assert_eq!(FileFormat::from_path("Week 12.XLSM").unwrap(), FileFormat::Excel);
    /// assert_eq!(FileFormat::from_path("hours.csv").unwrap(), FileFormat::Csv);
    /// assert!(FileFormat::from_path("notes.pdf").is_err());
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> EtlResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" => Ok(FileFormat::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(FileFormat::Excel),
            _ => Err(EtlError::UnsupportedFormat {
                path: path.display().to_string(),
                extension,
            }),
        }
    }
}

/// All sheets read from one file.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// The file path.
    pub path: String,
    /// Readable sheets in workbook order.
    pub sheets: Vec<SheetGrid>,
    /// Sheets that could not be read, with the reason.
    pub unreadable: Vec<(String, String)>,
}

impl Workbook {
    /// Looks up a sheet by name (case-insensitive), falling back to the first sheet.
    ///
    /// Returns the sheet and whether the fallback was used.
    pub fn select(&self, preferred: Option<&str>) -> Option<(&SheetGrid, bool)> {
        if let Some(name) = preferred {
            let wanted = name.trim().to_lowercase();
            if let Some(sheet) = self
                .sheets
                .iter()
                .find(|s| s.name.trim().to_lowercase() == wanted)
            {
                return Some((sheet, false));
            }
        }
        self.sheets
            .first()
            .map(|sheet| (sheet, preferred.is_some()))
    }
}

/// Loads every sheet of a CSV file or workbook.
///
/// # Errors
///
/// Returns [`EtlError::UnsupportedFormat`] for unknown extensions and
/// [`EtlError::FileUnreadable`] when the file is missing or corrupt, or when
/// a workbook has no readable sheet at all.
pub fn load_workbook<P: AsRef<Path>>(path: P) -> EtlResult<Workbook> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::Csv => {
            let bytes = fs::read(path).map_err(|e| EtlError::FileUnreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let (text, encoding) = decode_text(&bytes);
            debug!(path = %path.display(), encoding, "Decoded text file");

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("csv")
                .to_string();
            let grid = parse_delimited(&name, &text).map_err(|e| EtlError::FileUnreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            Ok(Workbook {
                path: path.display().to_string(),
                sheets: vec![grid],
                unreadable: Vec::new(),
            })
        }
        FileFormat::Excel => load_excel(path),
    }
}

fn load_excel(path: &Path) -> EtlResult<Workbook> {
    let path_str = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|e| EtlError::FileUnreadable {
        path: path_str.clone(),
        message: e.to_string(),
    })?;

    let mut sheets = Vec::new();
    let mut unreadable = Vec::new();

    for name in workbook.sheet_names().to_vec() {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
                let rows = range
                    .rows()
                    .map(|row| row.iter().map(cell_from_data).collect())
                    .collect();
                sheets.push(SheetGrid {
                    name,
                    first_line,
                    rows,
                });
            }
            Err(e) => {
                let error = EtlError::SheetUnreadable {
                    path: path_str.clone(),
                    sheet: name.clone(),
                    message: e.to_string(),
                };
                warn!(%error, "Skipping unreadable sheet");
                unreadable.push((name, e.to_string()));
            }
        }
    }

    if sheets.is_empty() {
        return Err(EtlError::FileUnreadable {
            path: path_str,
            message: "workbook has no readable sheets".to_string(),
        });
    }

    Ok(Workbook {
        path: path_str,
        sheets,
        unreadable,
    })
}

/// Converts a `calamine` cell into a [`Cell`].
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Cell::Duration(dt.as_f64()),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
        Data::Error(e) => Cell::Error(format!("{:?}", e)),
    }
}

/// Decodes raw bytes to text, returning the text and the encoding used.
///
/// A byte-order mark wins; otherwise valid UTF-8 is taken as-is and anything
/// else is read as Windows-1252.
///
/// # Example
///
/// ```
/// use fleet_etl::ingest::decode_text;
///
/// let (text, encoding) = decode_text(b"\xEF\xBB\xBFEquip #,Job");
/// assert_eq!(text, "Equip #,Job");
/// assert_eq!(encoding, "UTF-8");
///
/// let (text, encoding) = decode_text(b"Caf\xE9");
/// assert_eq!(text, "Café");
/// assert_eq!(encoding, "windows-1252");
/// ```
pub fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (text.into_owned(), encoding.name());
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), UTF_8.name()),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text.into_owned(), WINDOWS_1252.name())
        }
    }
}

/// Picks the delimiter that occurs most often in the first lines of `text`.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();
    [b',', b';', b'\t', b'|']
        .into_iter()
        .max_by_key(|d| {
            let c = *d as char;
            sample
                .iter()
                .map(|line| line.matches(c).count())
                .sum::<usize>()
        })
        .filter(|d| sample.iter().any(|line| line.contains(*d as char)))
        .unwrap_or(b',')
}

/// Parses delimited text into a grid, keeping every row including blanks.
///
/// The csv reader drops empty lines, so they are padded back in as empty
/// rows to keep `rows[i]` on source line `i + 1`. Source lines are counted
/// from each record's byte offset. A quoted field spanning several lines
/// is followed by padding for its continuation lines. No row is treated as
/// a header here; that is the sniffer's job.
pub fn parse_delimited(name: &str, text: &str) -> Result<SheetGrid, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let bytes = text.as_bytes();
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut line = 1;
    let mut counted_to = 0;
    for result in reader.records() {
        let record = result?;
        if let Some(position) = record.position() {
            let start = position.byte() as usize;
            line += bytes
                .get(counted_to..start)
                .map_or(0, |span| span.iter().filter(|b| **b == b'\n').count());
            counted_to = start.max(counted_to);
        }
        while rows.len() + 1 < line {
            rows.push(Vec::new());
        }
        rows.push(record.iter().map(Cell::from_text).collect());
    }

    Ok(SheetGrid::new(name, rows))
}
