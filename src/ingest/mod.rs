//! Ingestion: loading files, locating the data region, resolving columns.
//!
//! The stages here turn a file on disk (or an injected record source) into
//! a [`RawSheet`](crate::models::RawSheet) with a
//! [`ColumnMapping`] ready for normalization.

mod loader;
mod resolver;
mod sniffer;
mod source;

pub use loader::{
    FileFormat, Workbook, cell_from_data, decode_text, load_workbook, parse_delimited,
    sniff_delimiter,
};
pub use resolver::{ColumnMapping, ResolvedColumn, resolve_columns};
pub use sniffer::{
    HeaderDetection, INDICATOR_BONUS, RowScore, SHORT_TEXT_BONUS, SniffOutcome, detect_header,
    score_row, sniff_sheet,
};
pub use source::{RecordSource, StaticSource, records_to_sheet};
