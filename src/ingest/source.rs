//! Injected record sources.
//!
//! Live feeds (telematics APIs and the like) deliver a list of key/value
//! records instead of a file. They are wrapped in the [`RecordSource`]
//! trait so the pipeline can run them through the same resolver and
//! normalizer as spreadsheets, and so tests can inject static data.

use serde_json::{Map, Value};

use crate::error::EtlResult;
use crate::models::{Cell, HeaderConfidence, RawSheet, SheetRow};

/// A provider of key/value records.
pub trait RecordSource {
    /// A short name used in reports and source locations.
    fn name(&self) -> &str;

    /// Fetches the records.
    fn fetch(&self) -> EtlResult<Vec<Map<String, Value>>>;
}

/// A record source backed by a fixed list.
///
/// # Example
///
/// ```
/// use fleet_etl::ingest::{RecordSource, StaticSource};
/// use serde_json::json;
///
/// let source = StaticSource::from_values("gauge", vec![
///     json!({"Asset": "EX-1", "Job": "JOBA", "Units": 0.5}),
/// ]);
/// assert_eq!(source.fetch().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    records: Vec<Map<String, Value>>,
}

impl StaticSource {
    /// Creates a source from ready-made records.
    pub fn new(name: impl Into<String>, records: Vec<Map<String, Value>>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// Creates a source from JSON values; non-object values are ignored.
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        let records = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Self::new(name, records)
    }
}

impl RecordSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> EtlResult<Vec<Map<String, Value>>> {
        Ok(self.records.clone())
    }
}

/// Lays key/value records out as a sheet.
///
/// The header is the union of record keys in first-seen order; missing
/// keys become empty cells. Record `i` is reported as line `i + 2`, as if
/// the header were line 1.
pub fn records_to_sheet(name: &str, records: &[Map<String, Value>]) -> RawSheet {
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, record)| SheetRow {
            line: i + 2,
            cells: headers
                .iter()
                .map(|h| record.get(h).map(Cell::from_json).unwrap_or(Cell::Empty))
                .collect(),
        })
        .collect();

    RawSheet {
        origin: name.to_string(),
        name: name.to_string(),
        headers,
        header_line: 1,
        confidence: HeaderConfidence::Detected,
        rows,
    }
}
