//! Field access for exportable rows.

use std::fmt;

use chrono::Weekday;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{ExportColumn, fields};
use crate::models::{AllocationRow, NormalizedRecord, Period};

/// One exported cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportValue {
    /// Text content.
    Text(String),
    /// A number, written as a number to XLSX.
    Number(Decimal),
    /// Nothing to write.
    Empty,
}

impl ExportValue {
    fn from_option(value: Option<&str>) -> Self {
        match value {
            Some(text) => ExportValue::Text(text.to_string()),
            None => ExportValue::Empty,
        }
    }

    /// The value as non-empty text, if any.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ExportValue::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Text(text) => write!(f, "{}", text),
            ExportValue::Number(n) => write!(f, "{}", n.normalize()),
            ExportValue::Empty => Ok(()),
        }
    }
}

/// A row that can be written to a deliverable.
///
/// Fields are addressed by name; anything not built in falls back to the
/// row's mapped attributes.
pub trait ExportRow {
    /// Looks up a field by name.
    fn field_value(&self, field: &str) -> ExportValue;

    /// The value summed into partition totals.
    fn summary_value(&self) -> Decimal;

    /// Columns written when a layout configures none.
    fn default_columns() -> Vec<ExportColumn>;
}

fn column(field: &str, header: &str) -> ExportColumn {
    ExportColumn {
        field: field.to_string(),
        header: header.to_string(),
    }
}

/// Record fields: `entity_id`, `period` (single-entry records), `total` or
/// `value`, `job`, `cost_code`, day names (`sun`..`sat`) for per-day sums,
/// then attributes.
impl ExportRow for NormalizedRecord {
    fn field_value(&self, field: &str) -> ExportValue {
        match field {
            "entity_id" => ExportValue::Text(self.entity_id().to_string()),
            "period" => match self.entries() {
                [entry] if entry.period != Period::Unknown => {
                    ExportValue::Text(entry.period.to_string())
                }
                _ => ExportValue::Empty,
            },
            "total" | "value" => ExportValue::Number(self.total()),
            fields::JOB => ExportValue::from_option(self.job()),
            fields::COST_CODE => ExportValue::from_option(self.cost_code()),
            other => match other.parse::<Weekday>() {
                Ok(day) => ExportValue::Number(self.value_on(day)),
                Err(_) => ExportValue::from_option(self.attribute(other)),
            },
        }
    }

    fn summary_value(&self) -> Decimal {
        self.total()
    }

    fn default_columns() -> Vec<ExportColumn> {
        vec![
            column("entity_id", "Entity"),
            column("period", "Period"),
            column("total", "Total"),
        ]
    }
}

/// Allocation fields: `equipment_id` (or `entity_id`), `job`, `units`,
/// `rate`, `amount` (or `total`), then attributes.
impl ExportRow for AllocationRow {
    fn field_value(&self, field: &str) -> ExportValue {
        match field {
            "equipment_id" | "entity_id" => ExportValue::Text(self.equipment_id.clone()),
            fields::JOB => ExportValue::from_option(self.job.as_deref()),
            fields::UNITS => ExportValue::Number(self.units),
            fields::RATE => ExportValue::Number(self.rate),
            fields::AMOUNT | "total" => ExportValue::Number(self.amount),
            other => ExportValue::from_option(self.attributes.get(other).map(String::as_str)),
        }
    }

    fn summary_value(&self) -> Decimal {
        self.amount
    }

    fn default_columns() -> Vec<ExportColumn> {
        vec![
            column("equipment_id", "Equipment"),
            column(fields::JOB, "Job"),
            column(fields::UNITS, "Units"),
            column(fields::RATE, "Rate"),
            column(fields::AMOUNT, "Amount"),
        ]
    }
}
