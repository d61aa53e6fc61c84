//! Equipment allocation correction.
//!
//! A piece of equipment can be billed to several jobs in the same period, but
//! its shares must never add up to more than one full unit. Over-allocated
//! equipment is rescaled proportionally in a single deterministic pass; any
//! equipment still over the limit afterwards (through rounding) is reported,
//! never retried.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CorrectionPolicy;
use crate::models::{AllocationAdjustment, AllocationRow, JobAllocation, ResidualViolation};

/// The corrected rows with their audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionResult {
    /// All rows, in input order, with corrected units and amounts.
    pub rows: Vec<AllocationRow>,
    /// One entry per rescaled piece of equipment, ordered by equipment id.
    pub adjustments: Vec<AllocationAdjustment>,
    /// Equipment still over `max_units + tolerance` after correction.
    pub residual_violations: Vec<ResidualViolation>,
    /// Total units per equipment after correction.
    pub totals: BTreeMap<String, Decimal>,
}

/// Sums units per equipment id.
pub fn equipment_totals(rows: &[AllocationRow]) -> BTreeMap<String, Decimal> {
    let mut totals = BTreeMap::new();
    for row in rows {
        *totals.entry(row.equipment_id.clone()).or_insert(Decimal::ZERO) += row.units;
    }
    totals
}

/// Finds equipment whose total units exceed `max_units + tolerance`.
pub fn find_residual_violations(
    rows: &[AllocationRow],
    policy: &CorrectionPolicy,
) -> Vec<ResidualViolation> {
    let limit = policy.max_units + policy.tolerance;
    equipment_totals(rows)
        .into_iter()
        .filter(|(_, total)| *total > limit)
        .map(|(equipment_id, total)| ResidualViolation {
            equipment_id,
            total,
            limit,
        })
        .collect()
}

/// Rescales over-allocated equipment so each carries at most `max_units`.
///
/// For every equipment whose units sum to more than `max_units`, each row's
/// units become `units × max_units / total` rounded to `unit_precision`
/// places, and its amount becomes `units × rate` rounded to
/// `amount_precision` places. Equipment at or under the limit is left
/// untouched. Row order is preserved.
///
/// # Examples
///
/// ```
/// use fleet_etl::config::CorrectionPolicy;
/// use fleet_etl::models::{AllocationRow, SourceLocation};
/// use fleet_etl::processing::correct_allocations;
/// use rust_decimal::Decimal;
/// use std::collections::BTreeMap;
/// use std::str::FromStr;
///
/// let row = |job: &str, units: &str| AllocationRow {
///     equipment_id: "EX-1".to_string(),
///     job: Some(job.to_string()),
///     units: Decimal::from_str(units).unwrap(),
///     rate: Decimal::new(100, 0),
///     amount: Decimal::from_str(units).unwrap() * Decimal::new(100, 0),
///     attributes: BTreeMap::new(),
///     location: SourceLocation { origin: "billing.csv".to_string(), sheet: "billing".to_string(), line: 2 },
/// };
///
/// let result = correct_allocations(vec![row("JOBA", "0.7"), row("JOBB", "0.6")], &CorrectionPolicy::default());
/// assert_eq!(result.rows[0].units, Decimal::from_str("0.5385").unwrap());
/// assert_eq!(result.rows[1].units, Decimal::from_str("0.4615").unwrap());
/// assert_eq!(result.adjustments.len(), 1);
/// ```
pub fn correct_allocations(
    mut rows: Vec<AllocationRow>,
    policy: &CorrectionPolicy,
) -> CorrectionResult {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        groups.entry(row.equipment_id.clone()).or_default().push(index);
    }

    let mut adjustments = Vec::new();
    for (equipment_id, indices) in &groups {
        let old_total: Decimal = indices.iter().map(|&i| rows[i].units).sum();
        if old_total <= policy.max_units {
            continue;
        }

        let scale = policy.max_units / old_total;
        let before: Vec<JobAllocation> = indices.iter().map(|&i| job_allocation(&rows[i])).collect();

        for &i in indices {
            let row = &mut rows[i];
            row.units = (row.units * scale)
                .round_dp_with_strategy(policy.unit_precision, RoundingStrategy::MidpointAwayFromZero);
            row.amount = (row.units * row.rate)
                .round_dp_with_strategy(policy.amount_precision, RoundingStrategy::MidpointAwayFromZero);
        }

        let after: Vec<JobAllocation> = indices.iter().map(|&i| job_allocation(&rows[i])).collect();
        let new_total: Decimal = after.iter().map(|a| a.units).sum();

        let reasoning = format!(
            "{} was allocated {} units across {} rows (limit {}); scaled by {} to {} units",
            equipment_id,
            old_total.normalize(),
            indices.len(),
            policy.max_units.normalize(),
            scale.round_dp(6).normalize(),
            new_total.normalize()
        );
        info!(equipment = %equipment_id, old_total = %old_total, new_total = %new_total, "Allocation corrected");

        adjustments.push(AllocationAdjustment {
            equipment_id: equipment_id.clone(),
            before,
            after,
            old_total,
            new_total,
            scale,
            reasoning,
        });
    }

    let residual_violations = find_residual_violations(&rows, policy);
    for violation in &residual_violations {
        warn!(
            equipment = %violation.equipment_id,
            total = %violation.total,
            limit = %violation.limit,
            "Allocation still over the limit after correction"
        );
    }

    let totals = equipment_totals(&rows);
    CorrectionResult {
        rows,
        adjustments,
        residual_violations,
        totals,
    }
}

fn job_allocation(row: &AllocationRow) -> JobAllocation {
    JobAllocation {
        job: row.job.clone(),
        units: row.units,
        amount: row.amount,
    }
}
