//! CSV and XLSX writers.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::config::ExportColumn;
use crate::error::{EtlError, EtlResult};

use super::{ExportRow, ExportValue, Partition, PartitionSummary};

/// Name of the XLSX summary tab.
pub const SUMMARY_SHEET: &str = "Summary";

const MAX_SHEET_NAME_LEN: usize = 31;

fn export_failed(path: &Path, error: impl Display) -> EtlError {
    EtlError::ExportFailed {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

/// Writes rows to a flat CSV file with the given columns.
pub fn write_csv<R: ExportRow>(path: &Path, columns: &[ExportColumn], rows: &[&R]) -> EtlResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_failed(path, e))?;

    writer
        .write_record(columns.iter().map(|c| c.header.as_str()))
        .map_err(|e| export_failed(path, e))?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| row.field_value(&c.field).to_string()))
            .map_err(|e| export_failed(path, e))?;
    }

    writer.flush().map_err(|e| export_failed(path, e))
}

/// Writes a workbook with a summary tab followed by one tab per partition.
pub fn write_xlsx<R: ExportRow>(
    path: &Path,
    columns: &[ExportColumn],
    partitions: &[Partition<'_, R>],
    summaries: &[PartitionSummary],
) -> EtlResult<()> {
    build_workbook(columns, partitions, summaries)
        .and_then(|mut workbook| workbook.save(path))
        .map_err(|e| export_failed(path, e))
}

fn build_workbook<R: ExportRow>(
    columns: &[ExportColumn],
    partitions: &[Partition<'_, R>],
    summaries: &[PartitionSummary],
) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    for (col, header) in ["Partition", "Rows", "Total"].iter().enumerate() {
        summary.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (index, entry) in summaries.iter().enumerate() {
        let row = index as u32 + 1;
        summary.write_string(row, 0, entry.name.as_str())?;
        summary.write_number(row, 1, entry.rows as f64)?;
        summary.write_number(row, 2, entry.total.to_f64().unwrap_or_default())?;
    }

    let mut used: BTreeSet<String> = BTreeSet::from([SUMMARY_SHEET.to_lowercase()]);
    for partition in partitions {
        let name = unique_sheet_name(&partition.name, &mut used);
        let sheet = workbook.add_worksheet();
        sheet.set_name(name.as_str())?;
        write_partition(sheet, columns, &partition.rows, &bold)?;
    }

    Ok(workbook)
}

fn write_partition<R: ExportRow>(
    sheet: &mut Worksheet,
    columns: &[ExportColumn],
    rows: &[&R],
    bold: &Format,
) -> Result<(), XlsxError> {
    for (col, column) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, column.header.as_str(), bold)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        for (col, column) in columns.iter().enumerate() {
            match row.field_value(&column.field) {
                ExportValue::Text(text) => {
                    sheet.write_string(line, col as u16, text)?;
                }
                ExportValue::Number(n) => {
                    sheet.write_number(line, col as u16, n.to_f64().unwrap_or_default())?;
                }
                ExportValue::Empty => {}
            }
        }
    }
    Ok(())
}

/// Turns a partition value into a valid, unused worksheet name.
///
/// Excel forbids `[]:*?/\` and names over 31 characters; collisions
/// (case-insensitive) get a numeric suffix.
pub fn unique_sheet_name(name: &str, used: &mut BTreeSet<String>) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let base = if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    };

    let mut candidate = base.clone();
    let mut counter = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({})", counter);
        let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.len());
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        counter += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_names_are_cleaned_and_unique() {
        let mut used = BTreeSet::from([SUMMARY_SHEET.to_lowercase()]);
        assert_eq!(unique_sheet_name("DFW", &mut used), "DFW");
        assert_eq!(unique_sheet_name("dfw", &mut used), "dfw (2)");
        assert_eq!(unique_sheet_name("summary", &mut used), "summary (2)");
        assert_eq!(unique_sheet_name("A/B", &mut used), "A_B");
        assert_eq!(unique_sheet_name("", &mut used), "Sheet");
    }

    #[test]
    fn test_long_sheet_names_are_truncated() {
        let mut used = BTreeSet::new();
        let long = "x".repeat(40);
        let first = unique_sheet_name(&long, &mut used);
        let second = unique_sheet_name(&long, &mut used);

        assert_eq!(first.len(), 31);
        assert_eq!(second.len(), 31);
        assert!(second.ends_with(" (2)"));
    }
}
