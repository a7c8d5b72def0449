//! Application configuration: a TOML file plus environment overrides.
//!
//! ```toml
//! [analysis]
//! bufferDistanceM = 30.0
//! populationAttribute = "estimacioPoblacio"
//! matchPolicy = "first"
//!
//! [datasets.buildings]
//! path = "static/data/edificis.geojson"
//! defaultCrs = "EPSG:25831"
//! ```
//!
//! Every key is optional. Environment variables win over the file.

use std::path::{Path, PathBuf};

use impact_map_analytics_models::AnalysisConfig;
use impact_map_geography_models::DatasetConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file read when `IMPACT_MAP_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "impact_map.toml";

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "IMPACT_MAP_CONFIG";
/// Environment variable overriding the buffer distance in metres.
pub const BUFFER_METERS_VAR: &str = "IMPACT_BUFFER_METERS";
/// Environment variable overriding the population attribute name.
pub const POPULATION_ATTRIBUTE_VAR: &str = "IMPACT_POPULATION_ATTRIBUTE";
/// Environment variable overriding the directory of the three datasets.
pub const DATA_DIR_VAR: &str = "IMPACT_DATA_DIR";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AppConfig`].
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidOverride {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Everything a front end needs to build an analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pipeline parameters.
    pub analysis: AnalysisConfig,
    /// Dataset locations.
    pub datasets: DatasetConfig,
}

impl AppConfig {
    /// Loads the config file named by `IMPACT_MAP_CONFIG` (or
    /// [`DEFAULT_CONFIG_FILE`]) and applies environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);

        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("Reading config from {}", path.display());
                Self::from_toml(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not valid.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies overrides from `lookup`, which maps a variable name to
    /// its value.
    ///
    /// The data directory override resets all three dataset paths to the
    /// default file names inside that directory, keeping their default
    /// CRSs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if the buffer distance is
    /// not a number.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = lookup(DATA_DIR_VAR) {
            let defaults = DatasetConfig::in_dir(Path::new(&dir));
            self.datasets.works.path = defaults.works.path;
            self.datasets.buildings.path = defaults.buildings.path;
            self.datasets.population.path = defaults.population.path;
        }

        if let Some(value) = lookup(BUFFER_METERS_VAR) {
            self.analysis.buffer_distance_m =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        name: BUFFER_METERS_VAR,
                        value,
                    })?;
        }

        if let Some(value) = lookup(POPULATION_ATTRIBUTE_VAR) {
            self.analysis.population_attribute = value;
        }

        Ok(())
    }
}
