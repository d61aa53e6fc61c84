//! The batch pipeline.
//!
//! A [`Pipeline`] is built from explicit configuration (pipeline settings
//! plus one source schema) and runs files or injected record sources
//! through loading, header sniffing, column resolution, normalization and,
//! for allocation sources, correction. Nothing at row or file level stops a
//! batch: problems are collected as issues in the [`BatchReport`].

mod inspect;

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{
    ConfigLoader, PipelineConfig, SnifferConfig, SourceConfig, SourceKind, fields,
};
use crate::error::EtlResult;
use crate::export::{ExportFormat, ExportSummary, Exporter};
use crate::ingest::{
    RecordSource, SniffOutcome, load_workbook, records_to_sheet, resolve_columns, sniff_sheet,
};
use crate::models::{
    AllocationRow, BatchReport, HeaderConfidence, Issue, IssueKind, NormalizedRecord, RawSheet,
    Severity,
};
use crate::processing::{
    CorrectionResult, EntityTotal, correct_allocations, normalize_allocations, normalize_records,
    summarize_by_entity,
};

pub use inspect::SheetInspection;

/// Skipped line numbers listed in a row-skip issue before truncating.
const MAX_LISTED_LINES: usize = 10;

/// The rows produced by a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchData {
    /// Normalized records from ledger or timecard sources.
    Records(Vec<NormalizedRecord>),
    /// Corrected allocation rows with their audit trail.
    Allocations(CorrectionResult),
}

impl BatchData {
    /// Number of rows produced.
    pub fn len(&self) -> usize {
        match self {
            BatchData::Records(records) => records.len(),
            BatchData::Allocations(result) => result.rows.len(),
        }
    }

    /// Returns true if the batch produced no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The normalized records, for ledger and timecard batches.
    pub fn records(&self) -> Option<&[NormalizedRecord]> {
        match self {
            BatchData::Records(records) => Some(records),
            BatchData::Allocations(_) => None,
        }
    }

    /// The correction result, for allocation batches.
    pub fn allocations(&self) -> Option<&CorrectionResult> {
        match self {
            BatchData::Allocations(result) => Some(result),
            BatchData::Records(_) => None,
        }
    }
}

/// The rows and report of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// The rows produced.
    pub data: BatchData,
    /// Counts and issues.
    pub report: BatchReport,
}

impl BatchOutcome {
    /// Per-entity totals of a record batch; empty for allocation batches.
    pub fn entity_totals(&self) -> Vec<EntityTotal> {
        self.data.records().map(summarize_by_entity).unwrap_or_default()
    }

    /// Writes the rows and records any empty expected partitions in the report.
    pub fn export(&mut self, exporter: &Exporter, format: ExportFormat) -> EtlResult<ExportSummary> {
        let summary = match &self.data {
            BatchData::Records(records) => exporter.export(records, format)?,
            BatchData::Allocations(result) => exporter.export(&result.rows, format)?,
        };
        self.report.issues.extend(summary.issues.iter().cloned());
        Ok(summary)
    }
}

/// Runs files or record sources through one source schema.
///
/// # Example
///
/// ```no_run
/// use fleet_etl::config::ConfigLoader;
/// use fleet_etl::pipeline::Pipeline;
///
/// let loader = ConfigLoader::load("./config").unwrap();
/// let pipeline = Pipeline::from_loader(&loader, "equipment_billing").unwrap();
/// let outcome = pipeline.process_files(&["billing_march.xlsx"]);
///
/// println!("{} rows, {} issues", outcome.data.len(), outcome.report.issues.len());
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    source: SourceConfig,
    sniffer: SnifferConfig,
}

impl Pipeline {
    /// Creates a pipeline; the source's indicators extend the sniffer's.
    pub fn new(config: PipelineConfig, source: SourceConfig) -> Self {
        let mut sniffer = config.sniffer.clone();
        for indicator in &source.indicators {
            if !sniffer
                .indicators
                .iter()
                .any(|i| i.eq_ignore_ascii_case(indicator))
            {
                sniffer.indicators.push(indicator.clone());
            }
        }
        Self {
            config,
            source,
            sniffer,
        }
    }

    /// Creates a pipeline for a named source of a loaded configuration.
    pub fn from_loader(loader: &ConfigLoader, source: &str) -> EtlResult<Self> {
        let source = loader.get_source(source)?.clone();
        Ok(Self::new(loader.pipeline().clone(), source))
    }

    /// The source schema.
    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    /// The effective sniffer settings.
    pub fn sniffer(&self) -> &SnifferConfig {
        &self.sniffer
    }

    /// Processes files in input order.
    ///
    /// Unreadable files are skipped and reported; the batch always completes.
    pub fn process_files<P: AsRef<Path>>(&self, paths: &[P]) -> BatchOutcome {
        let mut batch = Batch::new(&self.source.name);

        for path in paths {
            let path = path.as_ref();
            let workbook = match load_workbook(path) {
                Ok(workbook) => workbook,
                Err(error) => {
                    warn!(path = %path.display(), %error, "Skipping unreadable file");
                    batch.skip_file(path.display().to_string(), error.to_string());
                    continue;
                }
            };
            batch.report.files_processed += 1;
            info!(path = %workbook.path, sheets = workbook.sheets.len(), "Processing file");

            for (sheet, reason) in &workbook.unreadable {
                batch.issue(
                    IssueKind::FileUnreadable,
                    Severity::Medium,
                    format!("{}:sheet='{}'", workbook.path, sheet),
                    format!("sheet could not be read: {}", reason),
                );
            }

            let grids = match self.source.sheet.as_deref() {
                Some(preferred) => match workbook.select(Some(preferred)) {
                    Some((grid, fallback)) => {
                        if fallback && workbook.sheets.len() > 1 {
                            warn!(path = %workbook.path, preferred, using = %grid.name, "Preferred sheet not found; using first sheet");
                        } else if fallback {
                            debug!(path = %workbook.path, preferred, using = %grid.name, "Single-sheet file; using it");
                        }
                        vec![grid]
                    }
                    None => Vec::new(),
                },
                None => workbook.sheets.iter().collect(),
            };

            for grid in grids {
                match sniff_sheet(grid, &workbook.path, &self.sniffer) {
                    SniffOutcome::Located(sheet) => self.ingest_sheet(&mut batch, &sheet),
                    SniffOutcome::NoDataRegion => {
                        debug!(path = %workbook.path, sheet = %grid.name, "Sheet has no data region");
                        batch.issue(
                            IssueKind::NoDataRegion,
                            Severity::Low,
                            format!("{}:sheet='{}'", workbook.path, grid.name),
                            "sheet has no content",
                        );
                    }
                }
            }
        }

        self.finish(batch)
    }

    /// Processes an injected record source as if it were a one-sheet file.
    ///
    /// A failing source is reported as an unreadable file.
    ///
    /// # Example
    ///
    /// ```
    /// use fleet_etl::config::ConfigLoader;
    /// use fleet_etl::ingest::StaticSource;
    /// use fleet_etl::pipeline::Pipeline;
    /// use serde_json::json;
    ///
    /// let loader = ConfigLoader::load("./config").unwrap();
    /// let pipeline = Pipeline::from_loader(&loader, "equipment_billing").unwrap();
    /// let feed = StaticSource::from_values("telematics", vec![
    ///     json!({"Asset": "EX-1", "Job": "JOBA", "Units": 0.7, "Rate": 100}),
    ///     json!({"Asset": "EX-1", "Job": "JOBB", "Units": 0.6, "Rate": 100}),
    /// ]);
    ///
    /// let outcome = pipeline.process_source(&feed);
    /// let result = outcome.data.allocations().unwrap();
    /// assert_eq!(result.adjustments.len(), 1);
    /// ```
    pub fn process_source(&self, source: &dyn RecordSource) -> BatchOutcome {
        let mut batch = Batch::new(&self.source.name);

        match source.fetch() {
            Ok(records) => {
                batch.report.files_processed += 1;
                info!(source = source.name(), records = records.len(), "Processing record source");
                let sheet = records_to_sheet(source.name(), &records);
                if sheet.headers.is_empty() {
                    batch.issue(
                        IssueKind::NoDataRegion,
                        Severity::Low,
                        source.name(),
                        "source returned no records",
                    );
                } else {
                    self.ingest_sheet(&mut batch, &sheet);
                }
            }
            Err(error) => {
                warn!(source = source.name(), %error, "Record source unavailable");
                batch.skip_file(source.name().to_string(), error.to_string());
            }
        }

        self.finish(batch)
    }

    fn ingest_sheet(&self, batch: &mut Batch, sheet: &RawSheet) {
        let origin = format!("{}:sheet='{}'", sheet.origin, sheet.name);
        batch.report.sheets_processed += 1;

        if sheet.confidence == HeaderConfidence::LowConfidence {
            batch.issue(
                IssueKind::HeaderNotFound,
                Severity::Medium,
                origin.clone(),
                format!(
                    "no header row found in the first {} rows; row {} used",
                    self.sniffer.max_scan_rows, sheet.header_line
                ),
            );
        }

        let mapping = resolve_columns(&sheet.headers, &self.source.fields);
        for field in mapping.unmapped() {
            let severity = if *field == self.source.entity_field {
                Severity::High
            } else {
                Severity::Low
            };
            debug!(origin = %origin, field = %field, "Field not found in header");
            batch.issue(
                IssueKind::FieldUnmapped,
                severity,
                origin.clone(),
                format!("no column matches field '{}'", field),
            );
        }

        let (processed, skipped_lines, unreadable_units_lines) = match self.source.kind {
            SourceKind::Allocation => {
                let outcome = normalize_allocations(sheet, &mapping, &self.source);
                batch.allocations.extend(outcome.items);
                (
                    outcome.rows_processed,
                    outcome.skipped_lines,
                    outcome.unreadable_units_lines,
                )
            }
            SourceKind::Ledger | SourceKind::Timecard => {
                let outcome = normalize_records(sheet, &mapping, &self.source);
                batch.records.extend(outcome.items);
                (
                    outcome.rows_processed,
                    outcome.skipped_lines,
                    outcome.unreadable_units_lines,
                )
            }
        };
        let skipped = skipped_lines.len() + unreadable_units_lines.len();

        batch.report.rows_processed += processed;
        batch.report.rows_skipped += skipped;
        if !skipped_lines.is_empty() {
            batch.issue(
                IssueKind::RowSkipped,
                Severity::Medium,
                origin.clone(),
                format!(
                    "{} rows skipped without a usable '{}' (lines {})",
                    skipped_lines.len(),
                    self.source.entity_field,
                    list_lines(&skipped_lines)
                ),
            );
        }
        if !unreadable_units_lines.is_empty() {
            batch.issue(
                IssueKind::RowSkipped,
                Severity::Medium,
                origin.clone(),
                format!(
                    "{} rows skipped with unreadable '{}' (lines {})",
                    unreadable_units_lines.len(),
                    fields::UNITS,
                    list_lines(&unreadable_units_lines)
                ),
            );
        }

        info!(
            origin = %origin,
            header_line = sheet.header_line,
            rows = processed,
            skipped,
            "Sheet processed"
        );
    }

    fn finish(&self, mut batch: Batch) -> BatchOutcome {
        let data = match self.source.kind {
            SourceKind::Allocation => {
                let result = correct_allocations(batch.allocations, &self.config.correction);
                batch.report.residual_violations = result.residual_violations.len();
                for violation in &result.residual_violations {
                    batch.report.issues.push(Issue::new(
                        IssueKind::ResidualAllocationViolation,
                        Severity::High,
                        violation.equipment_id.clone(),
                        format!(
                            "total units {} exceed limit {} after correction",
                            violation.total.normalize(),
                            violation.limit.normalize()
                        ),
                    ));
                }
                BatchData::Allocations(result)
            }
            SourceKind::Ledger | SourceKind::Timecard => BatchData::Records(batch.records),
        };

        batch.report.duration_us = batch.start.elapsed().as_micros() as u64;
        info!(
            run_id = %batch.report.run_id,
            source = %batch.report.source,
            files = batch.report.files_processed,
            skipped_files = batch.report.files_skipped,
            rows = batch.report.rows_processed,
            issues = batch.report.issues.len(),
            duration_us = batch.report.duration_us,
            "Batch completed"
        );

        BatchOutcome {
            data,
            report: batch.report,
        }
    }
}

struct Batch {
    start: Instant,
    report: BatchReport,
    records: Vec<NormalizedRecord>,
    allocations: Vec<AllocationRow>,
}

impl Batch {
    fn new(source: &str) -> Self {
        Self {
            start: Instant::now(),
            report: BatchReport::new(source),
            records: Vec::new(),
            allocations: Vec::new(),
        }
    }

    fn issue(
        &mut self,
        kind: IssueKind,
        severity: Severity,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.report
            .issues
            .push(Issue::new(kind, severity, origin, message));
    }

    fn skip_file(&mut self, origin: String, message: String) {
        self.report.files_skipped += 1;
        self.issue(IssueKind::FileUnreadable, Severity::High, origin, message);
    }
}

fn list_lines(lines: &[usize]) -> String {
    let mut listed: Vec<String> = lines
        .iter()
        .take(MAX_LISTED_LINES)
        .map(|l| l.to_string())
        .collect();
    if lines.len() > MAX_LISTED_LINES {
        listed.push(format!("... {} more", lines.len() - MAX_LISTED_LINES));
    }
    listed.join(", ")
}
