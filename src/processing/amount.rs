//! Amount parsing for billing and job-cost ledgers.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::Cell;

use super::decimal_from_f64;

/// Parses a money or quantity cell.
///
/// Accepts plain numbers, currency symbols, thousands separators and
/// accounting negatives written in parentheses. Returns `None` for blanks
/// and text that is not a number.
///
/// # Examples
///
/// ```
/// use fleet_etl::models::Cell;
/// use fleet_etl::processing::try_parse_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(try_parse_amount(&Cell::from_text("$1,234.50")), Some(Decimal::new(123450, 2)));
/// assert_eq!(try_parse_amount(&Cell::from_text("(12.00)")), Some(Decimal::new(-1200, 2)));
/// assert_eq!(try_parse_amount(&Cell::from_text("TBD")), None);
/// ```
pub fn try_parse_amount(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Number(n) => decimal_from_f64(*n),
        Cell::Text(text) => parse_amount_text(text),
        _ => None,
    }
}

/// Parses textual amounts such as `$1,234.50`, `-45`, or `(12.00)`.
pub fn parse_amount_text(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let (negative, inner) = match trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(cleaned.trim_start_matches('+')).ok()?;
    Some(if negative { -value } else { value })
}
