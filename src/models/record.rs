//! Normalized record models.
//!
//! A [`NormalizedRecord`] is one entity-period observation produced from a
//! sheet row. Records are immutable once built; the total is derived from
//! the per-period entries at construction time.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The period bucket a value belongs to.
///
/// Periods order dates first (chronologically), then weekday buckets
/// (Sunday first), then unknown.
///
/// # Example
///
/// ```
/// use fleet_etl::models::Period;
/// use chrono::{NaiveDate, Weekday};
///
/// assert_eq!(Period::Weekday(Weekday::Sun).to_string(), "SUN");
/// let date = Period::Date(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
/// assert_eq!(date.weekday(), Some(Weekday::Sun));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Period {
    /// A calendar date.
    Date(NaiveDate),
    /// A day-of-week bucket from a weekly timecard.
    Weekday(Weekday),
    /// No period could be determined.
    Unknown,
}

impl Period {
    /// The day of week this period falls on, if known.
    pub fn weekday(&self) -> Option<Weekday> {
        match self {
            Period::Date(date) => Some(date.weekday()),
            Period::Weekday(day) => Some(*day),
            Period::Unknown => None,
        }
    }

    fn sort_key(&self) -> (u8, i64) {
        match self {
            Period::Date(date) => (0, i64::from(date.num_days_from_ce())),
            Period::Weekday(day) => (1, i64::from(day.num_days_from_sunday())),
            Period::Unknown => (2, 0),
        }
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Date(date) => write!(f, "{}", date),
            Period::Weekday(day) => write!(f, "{}", day.to_string().to_uppercase()),
            Period::Unknown => Ok(()),
        }
    }
}

/// A numeric value observed for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodValue {
    /// The period bucket.
    pub period: Period,
    /// Hours or amount for the period.
    pub value: Decimal,
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// The file path or record source name.
    pub origin: String,
    /// The sheet name.
    pub sheet: String,
    /// The 1-based source line.
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:sheet='{}':row={}", self.origin, self.sheet, self.line)
    }
}

/// One entity-period observation with canonical fields populated.
///
/// # Example
///
/// ```
/// use fleet_etl::models::{NormalizedRecord, Period, PeriodValue, SourceLocation};
/// use chrono::Weekday;
/// use rust_decimal::Decimal;
/// use std::collections::BTreeMap;
///
/// let record = NormalizedRecord::new(
///     "E100".to_string(),
///     vec![
///         PeriodValue { period: Period::Weekday(Weekday::Mon), value: Decimal::new(8, 0) },
///         PeriodValue { period: Period::Weekday(Weekday::Tue), value: Decimal::new(75, 1) },
///     ],
///     None,
///     None,
///     BTreeMap::new(),
///     SourceLocation { origin: "week.csv".to_string(), sheet: "week".to_string(), line: 2 },
/// );
/// assert_eq!(record.total(), Decimal::new(155, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    entity_id: String,
    entries: Vec<PeriodValue>,
    job: Option<String>,
    cost_code: Option<String>,
    attributes: BTreeMap<String, String>,
    total: Decimal,
    location: SourceLocation,
}

impl NormalizedRecord {
    /// Builds a record; the total is the sum of the entry values.
    pub fn new(
        entity_id: String,
        entries: Vec<PeriodValue>,
        job: Option<String>,
        cost_code: Option<String>,
        attributes: BTreeMap<String, String>,
        location: SourceLocation,
    ) -> Self {
        let total = entries.iter().map(|e| e.value).sum();
        Self {
            entity_id,
            entries,
            job,
            cost_code,
            attributes,
            total,
            location,
        }
    }

    /// The primary entity identifier (employee, driver, asset).
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Per-period values in source column order.
    pub fn entries(&self) -> &[PeriodValue] {
        &self.entries
    }

    /// The job number, when mapped and present.
    pub fn job(&self) -> Option<&str> {
        self.job.as_deref()
    }

    /// The cost code, when mapped and present.
    pub fn cost_code(&self) -> Option<&str> {
        self.cost_code.as_deref()
    }

    /// Additional mapped fields such as division or name.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Looks up an additional mapped field.
    pub fn attribute(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).map(String::as_str)
    }

    /// Sum of all entry values.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Where this record was read from.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Sum of entry values falling on the given weekday.
    pub fn value_on(&self, day: Weekday) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.period.weekday() == Some(day))
            .map(|e| e.value)
            .sum()
    }
}
