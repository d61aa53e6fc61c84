//! Per-entity summaries of normalized records.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{NormalizedRecord, Period, PeriodValue};

/// Aggregated values for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTotal {
    /// The entity identifier.
    pub entity_id: String,
    /// Number of records contributing.
    pub records: usize,
    /// Sum of the record totals.
    pub total: Decimal,
    /// Per-period sums in period order.
    pub periods: Vec<PeriodValue>,
}

/// Aggregates records per entity, ordered by entity id.
///
/// # Example
///
/// ```
/// use fleet_etl::models::{NormalizedRecord, Period, PeriodValue, SourceLocation};
/// use fleet_etl::processing::summarize_by_entity;
/// use chrono::Weekday;
/// use rust_decimal::Decimal;
/// use std::collections::BTreeMap;
///
/// let record = |id: &str, hours: i64| NormalizedRecord::new(
///     id.to_string(),
///     vec![PeriodValue { period: Period::Weekday(Weekday::Mon), value: Decimal::from(hours) }],
///     None,
///     None,
///     BTreeMap::new(),
///     SourceLocation { origin: "week.csv".to_string(), sheet: "week".to_string(), line: 2 },
/// );
///
/// let totals = summarize_by_entity(&[record("E2", 4), record("E1", 8), record("E2", 3)]);
/// assert_eq!(totals[0].entity_id, "E1");
/// assert_eq!(totals[1].total, Decimal::from(7));
/// ```
pub fn summarize_by_entity(records: &[NormalizedRecord]) -> Vec<EntityTotal> {
    let mut grouped: BTreeMap<&str, (usize, Decimal, BTreeMap<Period, Decimal>)> = BTreeMap::new();
    for record in records {
        let (count, total, periods) = grouped
            .entry(record.entity_id())
            .or_insert_with(|| (0, Decimal::ZERO, BTreeMap::new()));
        *count += 1;
        *total += record.total();
        for entry in record.entries() {
            *periods.entry(entry.period).or_insert(Decimal::ZERO) += entry.value;
        }
    }

    grouped
        .into_iter()
        .map(|(entity_id, (records, total, periods))| EntityTotal {
            entity_id: entity_id.to_string(),
            records,
            total,
            periods: periods
                .into_iter()
                .map(|(period, value)| PeriodValue { period, value })
                .collect(),
        })
        .collect()
}
