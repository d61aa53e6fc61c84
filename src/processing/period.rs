//! Date and period resolution.
//!
//! A value's period comes from, in order: a date in the cell itself, a
//! date in the column label, a day name in the column label. Anything else
//! is [`Period::Unknown`].

use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};

use crate::models::{Cell, Period};

/// Excel serial numbers below this are not treated as dates when they
/// arrive as plain numbers (20000 is 1954-10-03).
pub const MIN_PLAUSIBLE_SERIAL: f64 = 20000.0;

/// Excel serial numbers above this are not treated as dates when they
/// arrive as plain numbers (80000 is 2119-01-10).
pub const MAX_PLAUSIBLE_SERIAL: f64 = 80000.0;

const DAY_NAMES: [(&str, Weekday); 7] = [
    ("sunday", Weekday::Sun),
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Converts an Excel serial day number to a date.
///
/// Uses the 1899-12-30 epoch, which absorbs Excel's phantom 1900-02-29.
///
/// # Example
///
/// ```
/// use fleet_etl::processing::excel_serial_to_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(excel_serial_to_date(45355.0), NaiveDate::from_ymd_opt(2024, 3, 4));
/// ```
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}

/// Parses a date from a cell.
///
/// Date/time cells always convert. Numeric cells convert only within the
/// plausible serial range, so hour and unit values are never read as dates.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(serial) => excel_serial_to_date(*serial),
        Cell::Number(n) if (MIN_PLAUSIBLE_SERIAL..=MAX_PLAUSIBLE_SERIAL).contains(n) => {
            excel_serial_to_date(*n)
        }
        Cell::Text(text) => parse_date_text(text),
        _ => None,
    }
}

/// Parses a textual date.
///
/// Accepts `YYYY-MM-DD`, ISO date-times, `MM/DD/YYYY`, `MM/DD/YY` and
/// `DD-Mon-YYYY` (or `DD-Mon-YY`).
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }

    if text.contains('/') {
        return parse_with_year_width(text, '/', "%m/%d/%Y", "%m/%d/%y");
    }
    if text.contains('-') {
        return parse_with_year_width(text, '-', "%d-%b-%Y", "%d-%b-%y");
    }
    None
}

fn parse_with_year_width(
    text: &str,
    separator: char,
    four_digit: &str,
    two_digit: &str,
) -> Option<NaiveDate> {
    let year = text.rsplit(separator).next()?;
    let format = match year.len() {
        4 => four_digit,
        2 => two_digit,
        _ => return None,
    };
    NaiveDate::parse_from_str(text, format).ok()
}

/// Finds a day of week named in a column label.
///
/// Any alphabetic token of at least three letters that begins a full day
/// name counts, so `SUN`, `Sun Hrs`, `Thurs` and `Saturday` all match.
///
/// # Example
///
/// ```
/// use fleet_etl::processing::weekday_from_label;
/// use chrono::Weekday;
///
/// assert_eq!(weekday_from_label("SUN"), Some(Weekday::Sun));
/// assert_eq!(weekday_from_label("Mon 3/4"), Some(Weekday::Mon));
/// assert_eq!(weekday_from_label("Month"), None);
/// ```
pub fn weekday_from_label(label: &str) -> Option<Weekday> {
    label
        .split(|c: char| !c.is_alphabetic())
        .filter(|token| token.len() >= 3)
        .map(str::to_lowercase)
        .find_map(|token| {
            DAY_NAMES
                .iter()
                .find(|(name, _)| name.starts_with(token.as_str()))
                .map(|(_, day)| *day)
        })
}

/// Derives a period from a column label alone.
///
/// Returns `None` when the label names neither a date nor a day.
pub fn label_period(label: &str) -> Option<Period> {
    if let Some(date) = parse_date_text(label) {
        return Some(Period::Date(date));
    }
    if let Some(date) = label.split_whitespace().find_map(parse_date_text) {
        return Some(Period::Date(date));
    }
    weekday_from_label(label).map(Period::Weekday)
}

/// Resolves the period of a value from its cell and column label.
pub fn resolve_period(cell: &Cell, label: &str) -> Period {
    parse_date(cell)
        .map(Period::Date)
        .or_else(|| label_period(label))
        .unwrap_or(Period::Unknown)
}
