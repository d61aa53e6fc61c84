//! Error types for the fleet ETL pipeline.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for the conditions that stop a single operation. Row- and file-level
//! problems inside a batch are not raised as errors; they are collected as
//! [`Issue`](crate::models::Issue)s in the batch report instead.

use thiserror::Error;

/// The main error type for the fleet ETL pipeline.
///
/// # Example
///
/// ```
/// use fleet_etl::error::EtlError;
///
/// let error = EtlError::ConfigNotFound {
///     path: "/missing/pipeline.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/pipeline.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EtlError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Configuration parsed but is semantically inconsistent.
    #[error("Invalid configuration for source '{source_name}': {message}")]
    InvalidConfig {
        /// The source whose configuration is invalid.
        source_name: String,
        /// What is wrong with it.
        message: String,
    },

    /// No source configuration exists under the requested name.
    #[error("Source not found: {name}")]
    SourceNotFound {
        /// The requested source name.
        name: String,
    },

    /// An input file is missing, undecodable or corrupt.
    #[error("Unable to read '{path}': {message}")]
    FileUnreadable {
        /// The offending file.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The file extension is not one the loader understands.
    #[error("Unsupported file format '{extension}' for '{path}'")]
    UnsupportedFormat {
        /// The offending file.
        path: String,
        /// The extension that was found (empty when none).
        extension: String,
    },

    /// A worksheet inside an otherwise readable workbook could not be read.
    #[error("Unable to read sheet '{sheet}' in '{path}': {message}")]
    SheetUnreadable {
        /// The workbook path.
        path: String,
        /// The worksheet name.
        sheet: String,
        /// A description of the failure.
        message: String,
    },

    /// An injected record source failed to deliver records.
    #[error("Record source '{name}' unavailable: {message}")]
    SourceUnavailable {
        /// The name of the record source.
        name: String,
        /// A description of the failure.
        message: String,
    },

    /// Writing an output deliverable failed.
    #[error("Failed to export '{path}': {message}")]
    ExportFailed {
        /// The output path.
        path: String,
        /// A description of the failure.
        message: String,
    },
}

/// A type alias for Results that return EtlError.
pub type EtlResult<T> = Result<T, EtlError>;
