//! Fleet ETL: human-authored spreadsheets in, clean deliverables out.
//!
//! This crate ingests messy fleet-management spreadsheets (weekly timecards,
//! daily driver hours, job-cost billing and equipment allocation billing),
//! locates their data regions, maps their columns onto canonical fields,
//! normalizes the rows, corrects over-allocated equipment and writes
//! partitioned CSV and XLSX deliverables with a batch report.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod processing;
