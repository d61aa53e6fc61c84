//! Splitting rows into per-partition deliverables.

use std::collections::BTreeMap;

use crate::config::ExportLayout;

use super::ExportRow;

/// Partition name for rows lacking the partition attribute.
pub const UNASSIGNED: &str = "UNASSIGNED";

/// Partition name used when a layout is not partitioned.
pub const ALL_ROWS: &str = "ALL";

/// The rows belonging to one partition value.
#[derive(Debug)]
pub struct Partition<'a, R> {
    /// The partition value.
    pub name: String,
    /// The rows, in input order.
    pub rows: Vec<&'a R>,
}

/// Groups rows by the layout's `partition_by` field.
///
/// Values matching a configured partition (case-insensitively) take the
/// configured spelling. Configured partitions come first in configured
/// order, then other values alphabetically, then [`UNASSIGNED`]. Only
/// partitions with rows are returned. Unpartitioned layouts yield a single
/// [`ALL_ROWS`] partition, even when there are no rows.
pub fn partition_rows<'a, R: ExportRow>(rows: &'a [R], layout: &ExportLayout) -> Vec<Partition<'a, R>> {
    let Some(field) = layout.partition_by.as_deref() else {
        return vec![Partition {
            name: ALL_ROWS.to_string(),
            rows: rows.iter().collect(),
        }];
    };

    let mut expected: Vec<Vec<&'a R>> = vec![Vec::new(); layout.partitions.len()];
    let mut others: BTreeMap<String, Vec<&'a R>> = BTreeMap::new();
    let mut unassigned = Vec::new();

    for row in rows {
        let Some(value) = row.field_value(field).as_text() else {
            unassigned.push(row);
            continue;
        };
        match layout
            .partitions
            .iter()
            .position(|p| p.trim().eq_ignore_ascii_case(value.trim()))
        {
            Some(index) => expected[index].push(row),
            None => others.entry(value).or_default().push(row),
        }
    }

    let mut partitions: Vec<Partition<'a, R>> = layout
        .partitions
        .iter()
        .zip(expected)
        .map(|(name, rows)| Partition {
            name: name.clone(),
            rows,
        })
        .chain(others.into_iter().map(|(name, rows)| Partition { name, rows }))
        .collect();
    partitions.push(Partition {
        name: UNASSIGNED.to_string(),
        rows: unassigned,
    });
    partitions.retain(|p| !p.rows.is_empty());
    partitions
}

/// Configured partitions that received no rows, in configured order.
pub fn empty_partitions<R>(layout: &ExportLayout, partitions: &[Partition<'_, R>]) -> Vec<String> {
    if layout.partition_by.is_none() {
        return Vec::new();
    }
    layout
        .partitions
        .iter()
        .filter(|expected| !partitions.iter().any(|p| &p.name == *expected))
        .cloned()
        .collect()
}

/// Makes a partition value safe for use in a file name.
///
/// # Example
///
/// ```
/// use fleet_etl::export::file_component;
///
/// assert_eq!(file_component("West Texas/2"), "West_Texas_2");
/// ```
pub fn file_component(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AllocationRow, SourceLocation};
    use rust_decimal::Decimal;

    fn row(equipment: &str, division: Option<&str>) -> AllocationRow {
        let mut attributes = BTreeMap::new();
        if let Some(division) = division {
            attributes.insert("division".to_string(), division.to_string());
        }
        AllocationRow {
            equipment_id: equipment.to_string(),
            job: None,
            units: Decimal::ONE,
            rate: Decimal::ONE,
            amount: Decimal::ONE,
            attributes,
            location: SourceLocation {
                origin: "billing.csv".to_string(),
                sheet: "billing".to_string(),
                line: 2,
            },
        }
    }

    fn layout(partitions: &[&str]) -> ExportLayout {
        ExportLayout {
            partition_by: Some("division".to_string()),
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
            ..ExportLayout::default()
        }
    }

    #[test]
    fn test_rows_grouped_in_configured_order() {
        let rows = vec![
            row("EX-1", Some("hou")),
            row("EX-2", Some("DFW")),
            row("EX-3", Some("ELP")),
            row("EX-4", None),
            row("EX-5", Some("HOU")),
        ];
        let layout = layout(&["DFW", "HOU", "WTX"]);
        let partitions = partition_rows(&rows, &layout);

        let names: Vec<&str> = partitions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["DFW", "HOU", "ELP", UNASSIGNED]);
        assert_eq!(partitions[1].rows.len(), 2);
        assert_eq!(partitions[1].rows[0].equipment_id, "EX-1");
        assert_eq!(empty_partitions(&layout, &partitions), vec!["WTX".to_string()]);
    }

    #[test]
    fn test_unpartitioned_layout_has_single_partition() {
        let rows = vec![row("EX-1", Some("DFW")), row("EX-2", None)];
        let layout = ExportLayout::default();
        let partitions = partition_rows(&rows, &layout);

        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].name, ALL_ROWS);
        assert_eq!(partitions[0].rows.len(), 2);
        assert!(empty_partitions(&layout, &partitions).is_empty());
    }

    #[test]
    fn test_no_rows_leaves_every_expected_partition_empty() {
        let rows: Vec<AllocationRow> = Vec::new();
        let layout = layout(&["DFW", "HOU"]);
        let partitions = partition_rows(&rows, &layout);

        assert!(partitions.is_empty());
        assert_eq!(empty_partitions(&layout, &partitions).len(), 2);
    }

    #[test]
    fn test_file_component() {
        assert_eq!(file_component(" DFW "), "DFW");
        assert_eq!(file_component("a.b"), "a_b");
    }
}
