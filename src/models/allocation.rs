//! Equipment allocation models.
//!
//! This module contains the [`AllocationRow`] billed per job, plus the audit
//! records produced when the corrector rescales an over-allocated piece of
//! equipment.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SourceLocation;

/// One equipment billing line: a share of a piece of equipment billed to a job.
///
/// # Example
///
/// ```
/// use fleet_etl::models::{AllocationRow, SourceLocation};
/// use rust_decimal::Decimal;
/// use std::collections::BTreeMap;
///
/// let row = AllocationRow {
///     equipment_id: "EX-1".to_string(),
///     job: Some("JOBA".to_string()),
///     units: Decimal::new(7, 1),
///     rate: Decimal::new(100, 0),
///     amount: Decimal::new(70, 0),
///     attributes: BTreeMap::new(),
///     location: SourceLocation { origin: "billing.csv".to_string(), sheet: "billing".to_string(), line: 2 },
/// };
/// assert_eq!(row.units * row.rate, row.amount);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRow {
    /// The equipment (asset) identifier.
    pub equipment_id: String,
    /// The job the share is billed to, when known.
    pub job: Option<String>,
    /// Fractional share of the equipment for the period (0.0–1.0 per job).
    pub units: Decimal,
    /// Rate per full allocation unit.
    pub rate: Decimal,
    /// Billed amount.
    pub amount: Decimal,
    /// Additional mapped fields such as division.
    pub attributes: BTreeMap<String, String>,
    /// Where this row was read from.
    pub location: SourceLocation,
}

/// A job's share of one piece of equipment, as recorded in audit output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAllocation {
    /// The job, when known.
    pub job: Option<String>,
    /// Allocated units.
    pub units: Decimal,
    /// Billed amount.
    pub amount: Decimal,
}

/// Audit entry for one piece of equipment rescaled by the corrector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationAdjustment {
    /// The corrected equipment.
    pub equipment_id: String,
    /// Per-job allocations before correction, in row order.
    pub before: Vec<JobAllocation>,
    /// Per-job allocations after correction, in row order.
    pub after: Vec<JobAllocation>,
    /// Sum of units before correction.
    pub old_total: Decimal,
    /// Sum of units after correction.
    pub new_total: Decimal,
    /// The factor applied to every row's units.
    pub scale: Decimal,
    /// Human-readable explanation of the correction.
    pub reasoning: String,
}

/// A piece of equipment still over the allocation limit after correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualViolation {
    /// The offending equipment.
    pub equipment_id: String,
    /// Its total units after correction.
    pub total: Decimal,
    /// The limit including rounding tolerance.
    pub limit: Decimal,
}
