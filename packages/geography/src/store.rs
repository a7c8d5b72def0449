//! The load-once, read-many dataset store.

use impact_map_geography_models::{DatasetConfig, FeatureCollection};

use crate::IngestError;
use crate::ingest::load_collection;

/// The three collections an impact analysis reads.
///
/// Built once at start-up and never mutated afterwards, so it can be
/// shared across concurrent analyses behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct GeometryStore {
    works: FeatureCollection,
    buildings: FeatureCollection,
    population: FeatureCollection,
}

impl GeometryStore {
    /// Builds a store from already-parsed collections.
    #[must_use]
    pub const fn new(
        works: FeatureCollection,
        buildings: FeatureCollection,
        population: FeatureCollection,
    ) -> Self {
        Self {
            works,
            buildings,
            population,
        }
    }

    /// Loads all three datasets from disk.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if any dataset fails to load.
    pub fn load(config: &DatasetConfig) -> Result<Self, IngestError> {
        log::info!("Loading works from {}", config.works.path.display());
        let works = load_collection(&config.works.path, config.works.default_crs)?;

        log::info!("Loading buildings from {}", config.buildings.path.display());
        let buildings = load_collection(&config.buildings.path, config.buildings.default_crs)?;

        log::info!(
            "Loading population from {}",
            config.population.path.display()
        );
        let population = load_collection(&config.population.path, config.population.default_crs)?;

        Ok(Self::new(works, buildings, population))
    }

    /// Construction works.
    #[must_use]
    pub const fn works(&self) -> &FeatureCollection {
        &self.works
    }

    /// Building footprints.
    #[must_use]
    pub const fn buildings(&self) -> &FeatureCollection {
        &self.buildings
    }

    /// Resident population points.
    #[must_use]
    pub const fn population(&self) -> &FeatureCollection {
        &self.population
    }
}
