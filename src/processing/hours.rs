//! Hours parsing.
//!
//! Timecards encode hours as numbers, `H:MM` clock strings, suffixed strings
//! (`7.25h`, `8 hrs`), or Excel time values. Everything normalizes to a
//! decimal number of hours; unparsable input becomes zero.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::Cell;

use super::decimal_from_f64;

/// Decimal places kept when converting Excel day fractions to hours.
pub const SERIAL_HOURS_PRECISION: u32 = 4;

const HOUR_SUFFIXES: [&str; 5] = ["hours", "hour", "hrs", "hr", "h"];

/// Parses a cell as hours, returning zero for missing or unparsable values.
///
/// # Examples
///
/// ```
/// use fleet_etl::models::Cell;
/// use fleet_etl::processing::parse_hours;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(parse_hours(&Cell::from_text("8:30")), Decimal::from_str("8.5").unwrap());
/// assert_eq!(parse_hours(&Cell::from_text("7.25h")), Decimal::from_str("7.25").unwrap());
/// assert_eq!(parse_hours(&Cell::from_text("garbage")), Decimal::ZERO);
/// assert_eq!(parse_hours(&Cell::Empty), Decimal::ZERO);
/// ```
pub fn parse_hours(cell: &Cell) -> Decimal {
    try_parse_hours(cell).unwrap_or(Decimal::ZERO)
}

/// Parses a cell as hours, returning `None` when it holds no usable value.
///
/// Excel date/time cells contribute their time-of-day (fraction × 24);
/// Excel durations contribute their full length in hours.
pub fn try_parse_hours(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Number(n) => decimal_from_f64(*n),
        Cell::Text(text) => parse_hours_text(text),
        Cell::DateTime(serial) => serial_to_hours(serial.fract()),
        Cell::Duration(days) => serial_to_hours(*days),
        Cell::Empty | Cell::Bool(_) | Cell::Error(_) => None,
    }
}

/// Parses textual hours: `H:MM`, `H:MM:SS`, `Nh`/`N hrs`/`N hours`, or a plain number.
pub fn parse_hours_text(text: &str) -> Option<Decimal> {
    let lowered = text.trim().to_lowercase();
    let mut value = lowered.as_str();
    if let Some(stripped) = HOUR_SUFFIXES.iter().find_map(|s| value.strip_suffix(s)) {
        value = stripped.trim_end();
    }
    if value.is_empty() {
        return None;
    }

    if value.contains(':') {
        return parse_clock(value);
    }

    Decimal::from_str(value.trim_start_matches('+')).ok()
}

fn parse_clock(value: &str) -> Option<Decimal> {
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let hours = parts[0].parse::<u32>().ok()?;
    let minutes = parts[1].parse::<u32>().ok()?;
    let seconds = match parts.get(2) {
        Some(s) => s.parse::<u32>().ok()?,
        None => 0,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some(
        Decimal::from(hours)
            + Decimal::from(minutes) / Decimal::from(60)
            + Decimal::from(seconds) / Decimal::from(3600),
    )
}

fn serial_to_hours(days: f64) -> Option<Decimal> {
    let days = decimal_from_f64(days)?;
    Some((days * Decimal::from(24)).round_dp(SERIAL_HOURS_PRECISION).normalize())
}
