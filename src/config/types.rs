//! Configuration types for the ingestion pipeline.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

use super::fields;

/// Header sniffing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnifferConfig {
    /// Only this many leading rows are considered as header candidates.
    pub max_scan_rows: usize,
    /// A row must score strictly more than this to be the header.
    pub score_threshold: u32,
    /// Rows with fewer non-empty cells never qualify.
    pub min_cells: usize,
    /// Average non-empty cell length at or under which a row earns the short-text bonus.
    pub max_average_cell_len: usize,
    /// Keywords whose presence (case-insensitive) suggests a header row.
    pub indicators: Vec<String>,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            max_scan_rows: 30,
            score_threshold: 4,
            min_cells: 2,
            max_average_cell_len: 24,
            indicators: ["$", "date", "amount", "hours", "total", "id", "#", "job"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Allocation correction policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPolicy {
    /// Maximum total units a piece of equipment may carry across jobs.
    pub max_units: Decimal,
    /// Rounding tolerance above `max_units` accepted after correction.
    pub tolerance: Decimal,
    /// Decimal places kept on corrected units.
    pub unit_precision: u32,
    /// Decimal places kept on recomputed amounts.
    pub amount_precision: u32,
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self {
            max_units: Decimal::ONE,
            tolerance: Decimal::new(1, 2),
            unit_precision: 4,
            amount_precision: 2,
        }
    }
}

/// Pipeline-wide settings from `pipeline.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Header sniffing parameters.
    #[serde(default)]
    pub sniffer: SnifferConfig,
    /// Allocation correction policy.
    #[serde(default)]
    pub correction: CorrectionPolicy,
}

/// The shape of rows a source delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// One observation per row (date + value).
    Ledger,
    /// Weekly sheets with one column per day.
    Timecard,
    /// Equipment billing rows subject to allocation correction.
    Allocation,
}

/// How the value column of a ledger is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    /// Hours (`8:30`, `7.25h`, numbers, Excel times).
    #[default]
    Hours,
    /// Money or plain quantities (`$1,234.50`, `(12.00)`).
    Amount,
}

/// A canonical field and the label fragments that identify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSynonyms {
    /// The canonical field name.
    pub name: String,
    /// Case-insensitive substrings that identify the field's column.
    pub synonyms: Vec<String>,
}

/// Canonical fields with their synonyms, in resolution priority order.
///
/// # Example
///
/// ```
/// use fleet_etl::config::SynonymTable;
///
/// let table = SynonymTable::from_pairs(&[
///     ("employee_id", &["employee id", "empid", "emp_id"]),
///     ("hours", &["hours", "hrs"]),
/// ]);
/// assert_eq!(table.field_names(), vec!["employee_id", "hours"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymTable(Vec<FieldSynonyms>);

impl SynonymTable {
    /// Creates a table from its entries.
    pub fn new(entries: Vec<FieldSynonyms>) -> Self {
        Self(entries)
    }

    /// Convenience constructor from `(field, synonyms)` pairs.
    pub fn from_pairs(pairs: &[(&str, &[&str])]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(name, synonyms)| FieldSynonyms {
                    name: name.to_string(),
                    synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        )
    }

    /// Entries in priority order.
    pub fn entries(&self) -> &[FieldSynonyms] {
        &self.0
    }

    /// Field names in priority order.
    pub fn field_names(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns true if the table declares the field.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f.name == field)
    }
}

/// One output column: a record field and the header it is written under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumn {
    /// The record field to read.
    pub field: String,
    /// The header written to the deliverable.
    pub header: String,
}

/// Output layout for a source's deliverables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLayout {
    /// Output columns in order.
    #[serde(default)]
    pub columns: Vec<ExportColumn>,
    /// Attribute used to split output into one deliverable per value.
    #[serde(default)]
    pub partition_by: Option<String>,
    /// Partition values that are expected to appear.
    #[serde(default)]
    pub partitions: Vec<String>,
    /// Output file stem; defaults to the source name.
    #[serde(default)]
    pub file_stem: Option<String>,
}

/// Configuration for one kind of input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// The source name, used on the command line and in reports.
    pub name: String,
    /// The shape of rows this source delivers.
    pub kind: SourceKind,
    /// Preferred worksheet; the first sheet is used when it is absent.
    /// When unset, every sheet of a workbook is processed.
    #[serde(default)]
    pub sheet: Option<String>,
    /// The field identifying the primary entity of each row.
    pub entity_field: String,
    /// The field holding the observed value (ledger sources).
    #[serde(default)]
    pub value_field: Option<String>,
    /// How the value field is encoded.
    #[serde(default)]
    pub value_format: ValueFormat,
    /// The field holding the observation date (ledger sources).
    #[serde(default)]
    pub date_field: Option<String>,
    /// Keywords that suggest a header row, in addition to the pipeline defaults.
    #[serde(default)]
    pub indicators: Vec<String>,
    /// Canonical fields and their synonyms.
    pub fields: SynonymTable,
    /// Output layout.
    #[serde(default)]
    pub export: ExportLayout,
}

impl SourceConfig {
    /// Checks that every referenced field is declared in the synonym table.
    pub fn validate(&self) -> EtlResult<()> {
        let invalid = |message: String| EtlError::InvalidConfig {
            source_name: self.name.clone(),
            message,
        };

        let mut seen = HashSet::new();
        for entry in self.fields.entries() {
            if !seen.insert(entry.name.as_str()) {
                return Err(invalid(format!("field '{}' is declared twice", entry.name)));
            }
            if entry.synonyms.iter().all(|s| s.trim().is_empty()) {
                return Err(invalid(format!("field '{}' has no synonyms", entry.name)));
            }
        }

        let mut referenced = vec![("entity_field", Some(self.entity_field.as_str()))];
        referenced.push(("value_field", self.value_field.as_deref()));
        referenced.push(("date_field", self.date_field.as_deref()));
        for (key, field) in referenced {
            match field {
                Some(field) if !self.fields.contains(field) => {
                    return Err(invalid(format!(
                        "{} '{}' is not declared in fields",
                        key, field
                    )));
                }
                _ => {}
            }
        }

        match self.kind {
            SourceKind::Ledger if self.value_field.is_none() => {
                Err(invalid("ledger sources need a value_field".to_string()))
            }
            SourceKind::Allocation if !self.fields.contains(fields::UNITS) => Err(invalid(
                format!("allocation sources need a '{}' field", fields::UNITS),
            )),
            _ => Ok(()),
        }
    }

    /// The output file stem.
    pub fn file_stem(&self) -> &str {
        self.export.file_stem.as_deref().unwrap_or(&self.name)
    }
}

/// The complete configuration loaded from a configuration directory.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pipeline: PipelineConfig,
    sources: BTreeMap<String, SourceConfig>,
}

impl EtlConfig {
    /// Creates a new EtlConfig from its component parts.
    pub fn new(pipeline: PipelineConfig, sources: Vec<SourceConfig>) -> Self {
        Self {
            pipeline,
            sources: sources.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// Returns the pipeline settings.
    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Returns all sources keyed by name.
    pub fn sources(&self) -> &BTreeMap<String, SourceConfig> {
        &self.sources
    }
}
