//! Sheet inspection: what the pipeline would see in a file, without normalizing it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EtlResult;
use crate::ingest::{ColumnMapping, HeaderDetection, SniffOutcome, detect_header, load_workbook, resolve_columns, sniff_sheet};
use crate::models::HeaderConfidence;

use super::Pipeline;

/// The detected layout of one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetInspection {
    /// The sheet name.
    pub sheet: String,
    /// Whether a run over this file would read the sheet.
    pub selected: bool,
    /// The header detection result.
    pub detection: HeaderDetection,
    /// The 1-based line of the header row, when a data region exists.
    pub header_line: Option<usize>,
    /// How the header row was chosen, when a data region exists.
    pub confidence: Option<HeaderConfidence>,
    /// Header labels.
    pub headers: Vec<String>,
    /// Non-blank data rows below the header.
    pub data_rows: usize,
    /// The column mapping for the pipeline's source.
    pub mapping: Option<ColumnMapping>,
}

impl Pipeline {
    /// Reports the header row, confidence and column mapping of every sheet in a file.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when the file cannot be read.
    pub fn inspect_file<P: AsRef<Path>>(&self, path: P) -> EtlResult<Vec<SheetInspection>> {
        let workbook = load_workbook(path)?;
        let selected_name = match self.source().sheet.as_deref() {
            Some(preferred) => workbook
                .select(Some(preferred))
                .map(|(grid, _)| grid.name.clone()),
            None => None,
        };

        let inspections = workbook
            .sheets
            .iter()
            .map(|grid| {
                let selected = selected_name.as_ref().is_none_or(|name| *name == grid.name);
                let detection = detect_header(&grid.rows, self.sniffer());
                match sniff_sheet(grid, &workbook.path, self.sniffer()) {
                    SniffOutcome::Located(sheet) => SheetInspection {
                        sheet: grid.name.clone(),
                        selected,
                        detection,
                        header_line: Some(sheet.header_line),
                        confidence: Some(sheet.confidence),
                        data_rows: sheet.data_row_count(),
                        mapping: Some(resolve_columns(&sheet.headers, &self.source().fields)),
                        headers: sheet.headers,
                    },
                    SniffOutcome::NoDataRegion => SheetInspection {
                        sheet: grid.name.clone(),
                        selected,
                        detection,
                        header_line: None,
                        confidence: None,
                        headers: Vec::new(),
                        data_rows: 0,
                        mapping: None,
                    },
                }
            })
            .collect();

        Ok(inspections)
    }
}
