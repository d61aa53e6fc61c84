//! Configuration loading and management for the fleet ETL pipeline.
//!
//! This module loads pipeline settings and per-source schemas (synonym
//! tables, entity/value fields, export layouts) from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use fleet_etl::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config").unwrap();
//! println!("Sources: {:?}", config.source_names());
//! ```

pub mod fields;
mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    CorrectionPolicy, EtlConfig, ExportColumn, ExportLayout, FieldSynonyms, PipelineConfig,
    SnifferConfig, SourceConfig, SourceKind, SynonymTable, ValueFormat,
};
