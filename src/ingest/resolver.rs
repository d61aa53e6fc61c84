//! Column resolution.
//!
//! Maps canonical field names onto the human-authored column labels of a
//! sheet ("Employee ID", "EmpID", "Emp_ID", ...) using per-field synonym
//! substrings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SynonymTable;

/// The column a canonical field resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    /// Zero-based column index.
    pub index: usize,
    /// The column's label as it appears in the sheet.
    pub label: String,
}

/// Canonical field to column mapping for one sheet.
///
/// A field maps to at most one column and a column is claimed by at most
/// one field. Fields with no matching column are listed as unmapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    bindings: Vec<(String, ResolvedColumn)>,
    unmapped: Vec<String>,
}

impl ColumnMapping {
    /// The column a field resolved to.
    pub fn get(&self, field: &str) -> Option<&ResolvedColumn> {
        self.bindings
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, column)| column)
    }

    /// The column index a field resolved to.
    pub fn index(&self, field: &str) -> Option<usize> {
        self.get(field).map(|c| c.index)
    }

    /// Returns true if the field resolved to a column.
    pub fn is_mapped(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Resolved fields in synonym-table order.
    pub fn bindings(&self) -> &[(String, ResolvedColumn)] {
        &self.bindings
    }

    /// Fields with no matching column, in synonym-table order.
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }

    /// Indices of every claimed column.
    pub fn claimed_columns(&self) -> BTreeSet<usize> {
        self.bindings.iter().map(|(_, c)| c.index).collect()
    }
}

/// Resolves canonical fields against a header row.
///
/// Fields are processed in synonym-table order. Each takes the first
/// header label (in column order) that contains any of its synonyms as a
/// case-insensitive substring and has not already been claimed by an
/// earlier field. Empty labels never match.
///
/// # Example
///
/// ```
/// use fleet_etl::config::SynonymTable;
/// use fleet_etl::ingest::resolve_columns;
///
/// let table = SynonymTable::from_pairs(&[
///     ("equipment_id", &["equip", "asset"]),
///     ("job", &["job"]),
///     ("amount", &["amount"]),
/// ]);
/// let headers = vec!["Equip #".to_string(), "Job".to_string(), "Units".to_string()];
/// let mapping = resolve_columns(&headers, &table);
///
/// assert_eq!(mapping.index("equipment_id"), Some(0));
/// assert_eq!(mapping.get("job").unwrap().label, "Job");
/// assert_eq!(mapping.unmapped(), &["amount".to_string()]);
/// ```
pub fn resolve_columns(headers: &[String], table: &SynonymTable) -> ColumnMapping {
    let labels: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut claimed = BTreeSet::new();
    let mut mapping = ColumnMapping::default();

    for field in table.entries() {
        let synonyms: Vec<String> = field
            .synonyms
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let found = labels.iter().enumerate().find(|(index, label)| {
            !label.is_empty()
                && !claimed.contains(index)
                && synonyms.iter().any(|s| label.contains(s.as_str()))
        });

        match found {
            Some((index, _)) => {
                claimed.insert(index);
                debug!(field = %field.name, column = index, label = %headers[index], "Resolved column");
                mapping.bindings.push((
                    field.name.clone(),
                    ResolvedColumn {
                        index,
                        label: headers[index].clone(),
                    },
                ));
            }
            None => mapping.unmapped.push(field.name.clone()),
        }
    }

    mapping
}
