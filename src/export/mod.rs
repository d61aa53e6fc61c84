//! Export of normalized and corrected rows to CSV and XLSX deliverables.
//!
//! Columns come from the source's export layout (field plus header). When
//! the layout names a `partition_by` field, each partition value gets its
//! own CSV file and its own XLSX tab; expected partitions that received no
//! rows produce no output and are reported as
//! [`IssueKind::EmptyPartition`](crate::models::IssueKind::EmptyPartition).

mod partition;
mod row;
mod writers;

use std::fs;
use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ExportColumn, ExportLayout, SourceConfig};
use crate::error::{EtlError, EtlResult};
use crate::models::{Issue, IssueKind, Severity};

pub use partition::{ALL_ROWS, Partition, UNASSIGNED, empty_partitions, file_component, partition_rows};
pub use row::{ExportRow, ExportValue};
pub use writers::{SUMMARY_SHEET, unique_sheet_name, write_csv, write_xlsx};

/// Output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// One CSV file per partition.
    #[default]
    Csv,
    /// One workbook with a summary tab and one tab per partition.
    Xlsx,
    /// Both of the above.
    Both,
}

impl ExportFormat {
    fn writes_csv(self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::Both)
    }

    fn writes_xlsx(self) -> bool {
        matches!(self, ExportFormat::Xlsx | ExportFormat::Both)
    }
}

/// Row count and value total for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSummary {
    /// The partition value.
    pub name: String,
    /// Number of rows written.
    pub rows: usize,
    /// Sum of the rows' summary values.
    pub total: Decimal,
}

/// What an export wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
    /// Per-partition counts and totals.
    pub partitions: Vec<PartitionSummary>,
    /// Empty expected partitions.
    pub issues: Vec<Issue>,
}

/// Writes a source's deliverables into an output directory.
///
/// # Example
///
/// ```no_run
/// use fleet_etl::config::ConfigLoader;
/// use fleet_etl::export::{ExportFormat, Exporter};
/// use fleet_etl::models::AllocationRow;
///
/// let loader = ConfigLoader::load("./config").unwrap();
/// let source = loader.get_source("equipment_billing").unwrap();
/// let rows: Vec<AllocationRow> = Vec::new();
///
/// let summary = Exporter::new(source, "./out").export(&rows, ExportFormat::Both).unwrap();
/// println!("{} files written", summary.files.len());
/// ```
#[derive(Debug, Clone)]
pub struct Exporter {
    layout: ExportLayout,
    stem: String,
    out_dir: PathBuf,
}

impl Exporter {
    /// Creates an exporter for the source's layout and file stem.
    pub fn new(source: &SourceConfig, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: source.export.clone(),
            stem: source.file_stem().to_string(),
            out_dir: out_dir.into(),
        }
    }

    /// Writes the rows in the requested format.
    pub fn export<R: ExportRow>(&self, rows: &[R], format: ExportFormat) -> EtlResult<ExportSummary> {
        fs::create_dir_all(&self.out_dir).map_err(|e| EtlError::ExportFailed {
            path: self.out_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let columns: Vec<ExportColumn> = if self.layout.columns.is_empty() {
            R::default_columns()
        } else {
            self.layout.columns.clone()
        };

        let partitions = partition_rows(rows, &self.layout);
        let mut summary = ExportSummary {
            partitions: partitions
                .iter()
                .map(|p| PartitionSummary {
                    name: p.name.clone(),
                    rows: p.rows.len(),
                    total: p.rows.iter().map(|r| r.summary_value()).sum(),
                })
                .collect(),
            ..ExportSummary::default()
        };

        for name in empty_partitions(&self.layout, &partitions) {
            warn!(stem = %self.stem, partition = %name, "Expected partition has no rows; nothing written");
            summary.issues.push(Issue::new(
                IssueKind::EmptyPartition,
                Severity::Low,
                self.stem.clone(),
                format!("expected partition '{}' has no rows", name),
            ));
        }

        if format.writes_csv() {
            for partition in &partitions {
                let path = self.out_dir.join(self.csv_file_name(&partition.name));
                write_csv(&path, &columns, &partition.rows)?;
                info!(path = %path.display(), rows = partition.rows.len(), "CSV written");
                summary.files.push(path);
            }
        }

        if format.writes_xlsx() && !partitions.is_empty() {
            let path = self.out_dir.join(format!("{}.xlsx", self.stem));
            write_xlsx(&path, &columns, &partitions, &summary.partitions)?;
            info!(path = %path.display(), sheets = partitions.len() + 1, "Workbook written");
            summary.files.push(path);
        }

        Ok(summary)
    }

    fn csv_file_name(&self, partition: &str) -> String {
        if self.layout.partition_by.is_none() {
            format!("{}.csv", self.stem)
        } else {
            format!("{}_{}.csv", self.stem, file_component(partition))
        }
    }
}
