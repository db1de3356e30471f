//! Pipeline configuration.
//!
//! The default configuration is embedded at compile time. A TOML file given
//! on the command line (or through `EV_MAP_CONFIG`) replaces it, and
//! `EV_MAP_DATABASE` overrides the output database path.

use std::path::{Path, PathBuf};

use ev_map_region::DEFAULT_NAME_PROPERTY;
use ev_map_source_models::{SourceDefinition, SourceKind};
use serde::{Deserialize, Serialize};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "EV_MAP_CONFIG";

/// Environment variable overriding the output database path.
pub const DATABASE_ENV: &str = "EV_MAP_DATABASE";

/// Embedded default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The config is not valid TOML or does not match the schema.
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but a value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whole-run retry settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Where and what to persist.
    #[serde(default)]
    pub output: OutputConfig,
    /// Charging station source.
    pub stations: SourceDefinition,
    /// Region boundary source.
    pub boundaries: BoundaryConfig,
    /// Vehicle registration source.
    pub population: SourceDefinition,
}

/// Whole-run retry settings, distinct from per-source retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total pipeline attempts, including the first.
    pub max_attempts: u32,
    /// Delay before retry `n` is `retry_delay_secs * n` seconds.
    pub retry_delay_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 3,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output `DuckDB` path. Defaults to `data/charging_station.duckdb`.
    pub database: Option<PathBuf>,
    /// Whether to persist the cleaned `station_details` table.
    pub station_details: bool,
    /// Whether to keep a snapshot of every fetched payload.
    pub snapshots: bool,
    /// Snapshot directory. Defaults to `data/raw`.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database: None,
            station_details: true,
            snapshots: true,
            snapshot_dir: None,
        }
    }
}

impl OutputConfig {
    /// The database path to write to.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(ev_map_database::paths::output_db_path)
    }

    /// The snapshot directory, or `None` if snapshots are disabled.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.snapshots.then(|| {
            self.snapshot_dir
                .clone()
                .unwrap_or_else(ev_map_database::paths::raw_snapshot_dir)
        })
    }
}

/// The boundary source plus the feature property holding region names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Where the boundaries come from.
    #[serde(flatten)]
    pub source: SourceDefinition,
    /// Feature property holding the region name.
    #[serde(default = "default_name_property")]
    pub name_property: String,
}

fn default_name_property() -> String {
    DEFAULT_NAME_PROPERTY.to_string()
}

impl PipelineConfig {
    /// Parses and validates a TOML config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is invalid or a value is out of
    /// range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads the effective configuration.
    ///
    /// `path` wins over `EV_MAP_CONFIG`, which wins over the embedded
    /// default. `EV_MAP_DATABASE` then overrides the output path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chosen config cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

        let mut config = match path.or(env_path.as_deref()) {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                log::debug!("Using embedded default config");
                Self::from_toml_str(DEFAULT_CONFIG)?
            }
        };

        if let Some(database) = std::env::var_os(DATABASE_ENV) {
            config.output.database = Some(PathBuf::from(database));
        }

        Ok(config)
    }

    /// The source definitions, by role.
    #[must_use]
    pub fn sources(&self) -> [(SourceKind, &SourceDefinition); 3] {
        [
            (SourceKind::Stations, &self.stations),
            (SourceKind::Boundaries, &self.boundaries.source),
            (SourceKind::Population, &self.population),
        ]
    }

    /// Checks value ranges the TOML schema cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "run.max_attempts must be at least 1".to_string(),
            ));
        }

        for (kind, source) in self.sources() {
            if source.id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{kind}.id must not be empty")));
            }
            source
                .retry
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("{kind}.retry: {e}")))?;
        }

        let ids = self.sources().map(|(_, source)| source.id.as_str());
        if ids[0] == ids[1] || ids[0] == ids[2] || ids[1] == ids[2] {
            return Err(ConfigError::Invalid(
                "source ids must be distinct".to_string(),
            ));
        }

        if self.boundaries.name_property.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "boundaries.name_property must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
