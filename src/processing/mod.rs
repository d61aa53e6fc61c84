//! Processing: turning located sheets into records and correcting them.
//!
//! This module contains value parsing (hours, amounts, dates and periods),
//! record normalization for ledger, timecard and allocation sources, the
//! equipment allocation corrector, and per-entity summaries.

mod amount;
mod corrector;
mod hours;
mod normalizer;
mod period;
mod summary;

use std::str::FromStr;

use rust_decimal::Decimal;

pub use amount::{parse_amount_text, try_parse_amount};
pub use corrector::{CorrectionResult, correct_allocations, equipment_totals, find_residual_violations};
pub use hours::{SERIAL_HOURS_PRECISION, parse_hours, parse_hours_text, try_parse_hours};
pub use normalizer::{NormalizeOutcome, normalize_allocations, normalize_records};
pub use period::{
    MAX_PLAUSIBLE_SERIAL, MIN_PLAUSIBLE_SERIAL, excel_serial_to_date, label_period, parse_date,
    parse_date_text, resolve_period, weekday_from_label,
};
pub use summary::{EntityTotal, summarize_by_entity};

/// Converts a spreadsheet float to a decimal through its shortest textual
/// form, so `0.7` becomes exactly `0.7`.
pub(crate) fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}
