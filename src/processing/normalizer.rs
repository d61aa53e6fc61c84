//! Record normalization.
//!
//! Turns the rows of a located [`RawSheet`] into [`NormalizedRecord`]s (ledger
//! and timecard sources) or [`AllocationRow`]s (equipment billing), using the
//! column mapping produced by the resolver.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{SourceConfig, SourceKind, ValueFormat, fields};
use crate::ingest::ColumnMapping;
use crate::models::{
    AllocationRow, Cell, NormalizedRecord, Period, PeriodValue, RawSheet, SheetRow,
    SourceLocation,
};

use super::{label_period, parse_hours, resolve_period, try_parse_amount};

/// Items normalized from one sheet plus the row accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome<T> {
    /// The normalized items in row order.
    pub items: Vec<T>,
    /// Rows that produced an item.
    pub rows_processed: usize,
    /// Non-blank rows that were dropped.
    pub rows_skipped: usize,
    /// Source lines of rows dropped for lacking an entity identifier.
    pub skipped_lines: Vec<usize>,
    /// Source lines of allocation rows dropped because their units could not be read.
    pub unreadable_units_lines: Vec<usize>,
}

impl<T> Default for NormalizeOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            rows_processed: 0,
            rows_skipped: 0,
            skipped_lines: Vec::new(),
            unreadable_units_lines: Vec::new(),
        }
    }
}

impl<T> NormalizeOutcome<T> {
    fn accept(&mut self, item: T) {
        self.items.push(item);
        self.rows_processed += 1;
    }

    fn skip(&mut self, line: usize) {
        self.rows_skipped += 1;
        self.skipped_lines.push(line);
    }

    fn skip_unreadable_units(&mut self, line: usize) {
        self.rows_skipped += 1;
        self.unreadable_units_lines.push(line);
    }
}

/// Normalizes a ledger or timecard sheet into records.
///
/// Fully blank rows are ignored. Rows without an entity identifier are
/// skipped and counted. Timecard sources read every unclaimed column whose
/// label is a date or day name; a timecard sheet with no such column is
/// read as a ledger. Allocation sources read their units as the value.
///
/// # Example
///
/// ```
/// use fleet_etl::config::ConfigLoader;
/// use fleet_etl::ingest::resolve_columns;
/// use fleet_etl::models::{Cell, HeaderConfidence, RawSheet, SheetRow};
/// use fleet_etl::processing::normalize_records;
/// use rust_decimal::Decimal;
///
/// let loader = ConfigLoader::load("./config").unwrap();
/// let source = loader.get_source("timecard").unwrap();
/// let text = |values: &[&str]| values.iter().map(|v| Cell::from_text(v)).collect::<Vec<_>>();
/// let sheet = RawSheet {
///     origin: "week.csv".to_string(),
///     name: "week".to_string(),
///     headers: ["Emp ID", "SUN", "MON", "TUE"].iter().map(|s| s.to_string()).collect(),
///     header_line: 1,
///     confidence: HeaderConfidence::Detected,
///     rows: vec![SheetRow { line: 2, cells: text(&["E100", "8:00", "7.5", ""]) }],
/// };
/// let mapping = resolve_columns(&sheet.headers, &source.fields);
/// let outcome = normalize_records(&sheet, &mapping, source);
///
/// assert_eq!(outcome.items[0].total(), Decimal::new(155, 1));
/// ```
pub fn normalize_records(
    sheet: &RawSheet,
    mapping: &ColumnMapping,
    source: &SourceConfig,
) -> NormalizeOutcome<NormalizedRecord> {
    let entity_column = mapping.index(&source.entity_field);
    let job_column = mapping.index(fields::JOB);
    let cost_code_column = mapping.index(fields::COST_CODE);
    let value_field = match source.kind {
        SourceKind::Allocation => source.value_field.as_deref().or(Some(fields::UNITS)),
        _ => source.value_field.as_deref(),
    };

    let reserved = [
        Some(source.entity_field.as_str()),
        Some(fields::JOB),
        Some(fields::COST_CODE),
        value_field,
        source.date_field.as_deref(),
    ];
    let attributes = attribute_columns(mapping, &reserved);

    let period_columns = match source.kind {
        SourceKind::Timecard => period_columns(sheet, mapping),
        _ => Vec::new(),
    };
    if source.kind == SourceKind::Timecard && period_columns.is_empty() {
        debug!(sheet = %sheet.name, "No day or date columns found; reading timecard as a ledger");
    }

    let value_column = value_field.and_then(|f| mapping.index(f));
    let date_column = source.date_field.as_deref().and_then(|f| mapping.index(f));

    let mut outcome = NormalizeOutcome::default();
    for row in &sheet.rows {
        if row.is_blank() {
            continue;
        }
        let Some(entity_id) = text_at(row, entity_column) else {
            outcome.skip(row.line);
            continue;
        };

        let entries = if period_columns.is_empty() {
            ledger_entry(sheet, row, value_column, date_column, source.value_format)
                .into_iter()
                .collect()
        } else {
            period_columns
                .iter()
                .map(|(column, period)| PeriodValue {
                    period: *period,
                    value: parse_hours(row.get(*column)),
                })
                .collect()
        };

        outcome.accept(NormalizedRecord::new(
            entity_id,
            entries,
            text_at(row, job_column),
            text_at(row, cost_code_column),
            collect_attributes(row, &attributes),
            location(sheet, row),
        ));
    }

    outcome
}

/// Normalizes an equipment billing sheet into allocation rows.
///
/// Units accept plain numbers and percentages (`70%`). When the amount
/// column is missing or blank the amount is units × rate; when the rate
/// column is missing the rate is amount ÷ units. Rows without an equipment
/// identifier or with unreadable units are skipped and counted.
pub fn normalize_allocations(
    sheet: &RawSheet,
    mapping: &ColumnMapping,
    source: &SourceConfig,
) -> NormalizeOutcome<AllocationRow> {
    let entity_column = mapping.index(&source.entity_field);
    let job_column = mapping.index(fields::JOB);
    let units_column = mapping.index(fields::UNITS);
    let rate_column = mapping.index(fields::RATE);
    let amount_column = mapping.index(fields::AMOUNT);

    let reserved = [
        Some(source.entity_field.as_str()),
        Some(fields::JOB),
        Some(fields::UNITS),
        Some(fields::RATE),
        Some(fields::AMOUNT),
    ];
    let attributes = attribute_columns(mapping, &reserved);

    let mut outcome = NormalizeOutcome::default();
    for row in &sheet.rows {
        if row.is_blank() {
            continue;
        }
        let Some(equipment_id) = text_at(row, entity_column) else {
            outcome.skip(row.line);
            continue;
        };
        let Some(units) = units_column.and_then(|c| parse_units(row.get(c))) else {
            debug!(line = row.line, equipment = %equipment_id, "Unreadable units; row skipped");
            outcome.skip_unreadable_units(row.line);
            continue;
        };

        let rate = rate_column.and_then(|c| try_parse_amount(row.get(c)));
        let amount = amount_column.and_then(|c| try_parse_amount(row.get(c)));
        let (rate, amount) = match (rate, amount) {
            (Some(rate), Some(amount)) => (rate, amount),
            (Some(rate), None) => (rate, units * rate),
            (None, Some(amount)) if !units.is_zero() => ((amount / units).normalize(), amount),
            (None, Some(amount)) => (Decimal::ZERO, amount),
            (None, None) => (Decimal::ZERO, Decimal::ZERO),
        };

        outcome.accept(AllocationRow {
            equipment_id,
            job: text_at(row, job_column),
            units,
            rate,
            amount,
            attributes: collect_attributes(row, &attributes),
            location: location(sheet, row),
        });
    }

    outcome
}

fn parse_units(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Text(text) if text.trim().ends_with('%') => {
            let percent = text.trim().trim_end_matches('%');
            try_parse_amount(&Cell::from_text(percent)).map(|v| v / Decimal::from(100))
        }
        _ => try_parse_amount(cell),
    }
}

fn ledger_entry(
    sheet: &RawSheet,
    row: &SheetRow,
    value_column: Option<usize>,
    date_column: Option<usize>,
    format: ValueFormat,
) -> Option<PeriodValue> {
    let empty = Cell::Empty;
    let cell = value_column.map_or(&empty, |c| row.get(c));
    let value = match format {
        ValueFormat::Hours => parse_hours(cell),
        ValueFormat::Amount => try_parse_amount(cell)?,
    };

    let period = match date_column {
        Some(column) => resolve_period(row.get(column), &sheet.headers[column]),
        None => Period::Unknown,
    };

    Some(PeriodValue { period, value })
}

fn period_columns(sheet: &RawSheet, mapping: &ColumnMapping) -> Vec<(usize, Period)> {
    let claimed = mapping.claimed_columns();
    sheet
        .headers
        .iter()
        .enumerate()
        .filter(|(index, _)| !claimed.contains(index))
        .filter_map(|(index, label)| label_period(label).map(|p| (index, p)))
        .collect()
}

fn attribute_columns(mapping: &ColumnMapping, reserved: &[Option<&str>]) -> Vec<(String, usize)> {
    let reserved: BTreeSet<&str> = reserved.iter().flatten().copied().collect();
    mapping
        .bindings()
        .iter()
        .filter(|(field, _)| !reserved.contains(field.as_str()))
        .map(|(field, column)| (field.clone(), column.index))
        .collect()
}

fn collect_attributes(row: &SheetRow, columns: &[(String, usize)]) -> BTreeMap<String, String> {
    columns
        .iter()
        .filter_map(|(field, column)| row.get(*column).text().map(|t| (field.clone(), t)))
        .collect()
}

fn text_at(row: &SheetRow, column: Option<usize>) -> Option<String> {
    column.and_then(|c| row.get(c).text())
}

fn location(sheet: &RawSheet, row: &SheetRow) -> SourceLocation {
    SourceLocation {
        origin: sheet.origin.clone(),
        sheet: sheet.name.clone(),
        line: row.line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportLayout, SynonymTable};
    use crate::ingest::resolve_columns;
    use crate::models::HeaderConfidence;
    use chrono::{NaiveDate, Weekday};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sheet(headers: &[&str], rows: &[&[&str]]) -> RawSheet {
        RawSheet {
            origin: "test.csv".to_string(),
            name: "test".to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            header_line: 1,
            confidence: HeaderConfidence::Detected,
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| SheetRow {
                    line: i + 2,
                    cells: cells.iter().map(|c| Cell::from_text(c)).collect(),
                })
                .collect(),
        }
    }

    fn source(kind: SourceKind, fields: &[(&str, &[&str])]) -> SourceConfig {
        SourceConfig {
            name: "test".to_string(),
            kind,
            sheet: None,
            entity_field: "employee_id".to_string(),
            value_field: None,
            value_format: ValueFormat::Hours,
            date_field: None,
            indicators: vec![],
            fields: SynonymTable::from_pairs(fields),
            export: ExportLayout::default(),
        }
    }

    fn timecard() -> SourceConfig {
        source(
            SourceKind::Timecard,
            &[
                ("employee_id", &["emp id", "employee"]),
                ("employee_name", &["name"]),
                ("job", &["job"]),
                ("division", &["division", "div"]),
            ],
        )
    }

    fn ledger() -> SourceConfig {
        let mut source = source(
            SourceKind::Ledger,
            &[
                ("employee_id", &["emp id"]),
                ("date", &["date"]),
                ("hours", &["hours"]),
                ("cost_code", &["cost code"]),
            ],
        );
        source.value_field = Some("hours".to_string());
        source.date_field = Some("date".to_string());
        source
    }

    fn allocation() -> SourceConfig {
        let mut source = source(
            SourceKind::Allocation,
            &[
                ("equipment_id", &["equip", "asset"]),
                ("job", &["job"]),
                ("units", &["units"]),
                ("rate", &["rate"]),
                ("amount", &["amount"]),
                ("division", &["division"]),
            ],
        );
        source.entity_field = "equipment_id".to_string();
        source
    }

    fn run(source: &SourceConfig, sheet: &RawSheet) -> NormalizeOutcome<NormalizedRecord> {
        let mapping = resolve_columns(&sheet.headers, &source.fields);
        normalize_records(sheet, &mapping, source)
    }

    #[test]
    fn test_timecard_week_totals_with_blanks() {
        let sheet = sheet(
            &["Emp ID", "Name", "SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "Total"],
            &[&["E100", "Smith", "", "8:00", "7.5", "8:30", "", "6h", "", "30"]],
        );
        let outcome = run(&timecard(), &sheet);

        assert_eq!(outcome.rows_processed, 1);
        let record = &outcome.items[0];
        assert_eq!(record.entries().len(), 7);
        assert_eq!(record.total(), dec("30"));
        assert_eq!(record.value_on(Weekday::Sun), Decimal::ZERO);
        assert_eq!(record.value_on(Weekday::Wed), dec("8.5"));
        assert_eq!(record.attribute("employee_name"), Some("Smith"));
    }

    #[test]
    fn test_timecard_date_labels_become_dates() {
        let sheet = sheet(
            &["Emp ID", "03/03/2024", "03/04/2024"],
            &[&["E100", "4", "8:15"]],
        );
        let outcome = run(&timecard(), &sheet);
        let record = &outcome.items[0];

        assert_eq!(
            record.entries()[0].period,
            Period::Date(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())
        );
        assert_eq!(record.total(), dec("12.25"));
    }

    #[test]
    fn test_rows_without_entity_are_skipped_and_blank_rows_ignored() {
        let sheet = sheet(
            &["Emp ID", "SUN", "MON"],
            &[
                &["E100", "8", "8"],
                &["", "", ""],
                &["", "4", "4"],
                &["E200", "1", ""],
            ],
        );
        let outcome = run(&timecard(), &sheet);

        assert_eq!(outcome.rows_processed, 2);
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(outcome.skipped_lines, vec![4]);
        assert_eq!(outcome.items[1].location().line, 5);
    }

    #[test]
    fn test_ledger_rows_take_period_from_date_field() {
        let sheet = sheet(
            &["Date", "Emp ID", "Hours", "Cost Code"],
            &[
                &["2024-03-04", "D-12", "8:30", "0100"],
                &["garbage", "D-12", "junk", ""],
            ],
        );
        let outcome = run(&ledger(), &sheet);

        let first = &outcome.items[0];
        assert_eq!(
            first.entries()[0].period,
            Period::Date(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
        );
        assert_eq!(first.total(), dec("8.5"));
        assert_eq!(first.cost_code(), Some("0100"));

        let second = &outcome.items[1];
        assert_eq!(second.entries()[0].period, Period::Unknown);
        assert_eq!(second.total(), Decimal::ZERO);
        assert_eq!(second.cost_code(), None);
    }

    #[test]
    fn test_amount_ledger_leaves_unparsable_values_out() {
        let mut source = ledger();
        source.value_format = ValueFormat::Amount;
        let sheet = sheet(
            &["Date", "Emp ID", "Hours"],
            &[&["2024-03-04", "D-12", "$1,200.50"], &["2024-03-05", "D-12", "TBD"]],
        );
        let outcome = run(&source, &sheet);

        assert_eq!(outcome.items[0].total(), dec("1200.50"));
        assert!(outcome.items[1].entries().is_empty());
    }

    #[test]
    fn test_timecard_without_period_columns_reads_as_ledger() {
        let sheet = sheet(&["Emp ID", "Name"], &[&["E100", "Smith"]]);
        let outcome = run(&timecard(), &sheet);

        assert_eq!(outcome.rows_processed, 1);
        assert_eq!(outcome.items[0].entries().len(), 1);
        assert_eq!(outcome.items[0].total(), Decimal::ZERO);
    }

    #[test]
    fn test_allocation_rows() {
        let source = allocation();
        let sheet = sheet(
            &["Equip #", "Job", "Units", "Rate", "Division"],
            &[
                &["EX-1", "JOBA", "0.7", "100", "DFW"],
                &["EX-1", "JOBB", "60%", "$100.00", "DFW"],
                &["EX-2", "JOBA", "n/a", "50", "HOU"],
                &["", "JOBC", "1", "50", "HOU"],
            ],
        );
        let mapping = resolve_columns(&sheet.headers, &source.fields);
        let outcome = normalize_allocations(&sheet, &mapping, &source);

        assert_eq!(outcome.rows_processed, 2);
        assert_eq!(outcome.rows_skipped, 2);
        assert_eq!(outcome.skipped_lines, vec![5]);
        assert_eq!(outcome.unreadable_units_lines, vec![4]);
        assert_eq!(outcome.items[0].amount, dec("70"));
        assert_eq!(outcome.items[1].units, dec("0.6"));
        assert_eq!(outcome.items[1].amount, dec("60"));
        assert_eq!(
            outcome.items[0].attributes.get("division").map(String::as_str),
            Some("DFW")
        );
    }

    #[test]
    fn test_allocation_rate_derived_from_amount() {
        let source = allocation();
        let sheet = sheet(
            &["Asset", "Job", "Units", "Amount"],
            &[&["EX-3", "JOBA", "0.5", "$40.00"]],
        );
        let mapping = resolve_columns(&sheet.headers, &source.fields);
        let outcome = normalize_allocations(&sheet, &mapping, &source);

        assert_eq!(outcome.items[0].rate, dec("80"));
        assert_eq!(outcome.items[0].amount, dec("40"));
    }

    #[test]
    fn test_allocation_source_as_records_uses_units() {
        let source = allocation();
        let sheet = sheet(&["Equip #", "Units"], &[&["EX-1", "0.25"]]);
        let outcome = run(&source, &sheet);

        assert_eq!(outcome.items[0].total(), dec("0.25"));
        assert_eq!(outcome.items[0].entity_id(), "EX-1");
    }
}
