//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading pipeline and
//! source configurations from YAML files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{EtlError, EtlResult};

use super::types::{EtlConfig, PipelineConfig, SourceConfig};

/// Loads and provides access to pipeline configuration.
///
/// # Directory Structure
///
/// ```text
/// config/
/// ├── pipeline.yaml              # Sniffer and correction settings
/// └── sources/
///     ├── timecard.yaml          # One file per input source
///     └── equipment_billing.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use fleet_etl::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config").unwrap();
/// let source = loader.get_source("timecard").unwrap();
/// println!("Entity field: {}", source.entity_field);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EtlConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `pipeline.yaml` or the `sources` directory is missing
    /// - Any file contains invalid YAML
    /// - Any source fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> EtlResult<Self> {
        let path = path.as_ref();

        let pipeline = Self::load_yaml::<PipelineConfig>(&path.join("pipeline.yaml"))?;
        let sources = Self::load_sources(&path.join("sources"))?;

        debug!(
            path = %path.display(),
            sources = sources.len(),
            "Loaded pipeline configuration"
        );

        Ok(Self {
            config: EtlConfig::new(pipeline, sources),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EtlResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EtlError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EtlError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads and validates every source file in the sources directory.
    fn load_sources(sources_dir: &Path) -> EtlResult<Vec<SourceConfig>> {
        let dir_str = sources_dir.display().to_string();

        let entries = fs::read_dir(sources_dir).map_err(|_| EtlError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EtlError::ConfigNotFound {
                path: dir_str.clone(),
            })?;
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
            {
                paths.push(path);
            }
        }
        paths.sort();

        let mut sources: Vec<SourceConfig> = Vec::new();
        for path in paths {
            let source = Self::load_yaml::<SourceConfig>(&path)?;
            source.validate()?;
            if sources.iter().any(|s| s.name == source.name) {
                return Err(EtlError::InvalidConfig {
                    source_name: source.name,
                    message: format!("declared again in {}", path.display()),
                });
            }
            sources.push(source);
        }

        if sources.is_empty() {
            return Err(EtlError::ConfigNotFound {
                path: format!("{} (no source files found)", dir_str),
            });
        }

        Ok(sources)
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Returns the pipeline settings.
    pub fn pipeline(&self) -> &PipelineConfig {
        self.config.pipeline()
    }

    /// Gets a source configuration by name.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fleet_etl::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config")?;
    /// let source = loader.get_source("equipment_billing")?;
    /// assert_eq!(source.entity_field, "equipment_id");
    /// # Ok::<(), fleet_etl::error::EtlError>(())
    /// ```
    pub fn get_source(&self, name: &str) -> EtlResult<&SourceConfig> {
        self.config
            .sources()
            .get(name)
            .ok_or_else(|| EtlError::SourceNotFound {
                name: name.to_string(),
            })
    }

    /// Names of all configured sources, sorted.
    pub fn source_names(&self) -> Vec<&str> {
        self.config.sources().keys().map(String::as_str).collect()
    }
}
