//! Batch report models.
//!
//! Nothing below the batch level aborts a run. Problems are recorded as
//! [`Issue`]s and returned in a [`BatchReport`] alongside the results so
//! the caller can decide whether the run is acceptable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The category of a batch issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A file (or sheet) was missing, undecodable or corrupt and was skipped.
    FileUnreadable,
    /// Header sniffing failed; row 0 was used with low confidence.
    HeaderNotFound,
    /// A sheet contained no data at all and was skipped.
    NoDataRegion,
    /// A canonical field had no matching column; it is null for the sheet.
    FieldUnmapped,
    /// Rows lacking the entity identifier were dropped.
    RowSkipped,
    /// Equipment remained over the allocation limit after correction.
    ResidualAllocationViolation,
    /// An expected export partition had no rows.
    EmptyPartition,
}

/// How much attention an issue deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Low,
    /// Data may be incomplete.
    Medium,
    /// Data was lost or is known to be wrong.
    High,
}

/// A problem recorded during a batch run.
///
/// # Example
///
/// ```
/// use fleet_etl::models::{Issue, IssueKind, Severity};
///
/// let issue = Issue::new(
///     IssueKind::FieldUnmapped,
///     Severity::Low,
///     "week_12.csv",
///     "field 'cost_code' has no matching column",
/// );
/// assert_eq!(issue.kind, IssueKind::FieldUnmapped);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// The issue category.
    pub kind: IssueKind,
    /// The severity.
    pub severity: Severity,
    /// The file, sheet or source the issue concerns.
    pub origin: String,
    /// A human-readable description.
    pub message: String,
}

impl Issue {
    /// Creates a new issue.
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            origin: origin.into(),
            message: message.into(),
        }
    }
}

/// Counts and reasons for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// Crate version that produced the report.
    pub engine_version: String,
    /// The source configuration used.
    pub source: String,
    /// Files (or injected sources) that were read.
    pub files_processed: usize,
    /// Files that could not be read.
    pub files_skipped: usize,
    /// Sheets that produced a data region.
    pub sheets_processed: usize,
    /// Rows turned into records.
    pub rows_processed: usize,
    /// Non-blank rows dropped for lacking an entity identifier or readable units.
    pub rows_skipped: usize,
    /// Equipment still over the limit after correction.
    pub residual_violations: usize,
    /// Every issue recorded, in the order encountered.
    pub issues: Vec<Issue>,
    /// Wall-clock duration in microseconds.
    pub duration_us: u64,
}

impl BatchReport {
    /// Creates an empty report for a run over the named source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            source: source.into(),
            files_processed: 0,
            files_skipped: 0,
            sheets_processed: 0,
            rows_processed: 0,
            rows_skipped: 0,
            residual_violations: 0,
            issues: Vec::new(),
            duration_us: 0,
        }
    }

    /// Number of issues of the given kind.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// True when no file was skipped and no residual violation remains.
    pub fn is_clean(&self) -> bool {
        self.files_skipped == 0 && self.residual_violations == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_is_clean() {
        let report = BatchReport::new("timecard");
        assert!(report.is_clean());
        assert_eq!(report.source, "timecard");
        assert_eq!(report.engine_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_count_by_kind() {
        let mut report = BatchReport::new("billing");
        report.issues.push(Issue::new(
            IssueKind::RowSkipped,
            Severity::Medium,
            "a.csv",
            "2 rows",
        ));
        report.issues.push(Issue::new(
            IssueKind::FieldUnmapped,
            Severity::Low,
            "a.csv",
            "cost_code",
        ));
        report.issues.push(Issue::new(
            IssueKind::RowSkipped,
            Severity::Medium,
            "b.csv",
            "1 row",
        ));
        assert_eq!(report.count(IssueKind::RowSkipped), 2);
        assert_eq!(report.count(IssueKind::EmptyPartition), 0);
    }

    #[test]
    fn test_residual_violation_makes_report_unclean() {
        let mut report = BatchReport::new("equipment_billing");
        report.residual_violations = 1;
        assert!(!report.is_clean());
    }

    #[test]
    fn test_issue_kind_serializes_snake_case() {
        let json = serde_json::to_value(IssueKind::ResidualAllocationViolation).unwrap();
        assert_eq!(json, "residual_allocation_violation");
    }
}
