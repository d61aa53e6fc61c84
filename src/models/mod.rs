//! Core data models for the fleet ETL pipeline.
//!
//! This module contains the raw sheet types produced by the loader, the
//! normalized records and allocation rows produced by the normalizer, and
//! the batch report types.

mod allocation;
mod cell;
mod record;
mod report;
mod sheet;

pub use allocation::{AllocationAdjustment, AllocationRow, JobAllocation, ResidualViolation};
pub use cell::Cell;
pub use record::{NormalizedRecord, Period, PeriodValue, SourceLocation};
pub use report::{BatchReport, Issue, IssueKind, Severity};
pub use sheet::{HeaderConfidence, RawSheet, SheetGrid, SheetRow};
