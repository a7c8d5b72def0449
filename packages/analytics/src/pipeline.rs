//! The buffer, intersect, aggregate pipeline.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use geo::Geometry;
use impact_map_analytics_models::{AnalysisConfig, ImpactAnalysisResult};
use impact_map_geography::projection::{self, reproject, reproject_geometry};
use impact_map_geography::store::GeometryStore;
use impact_map_geography_models::FeatureCollection;
use impact_map_spatial::buffer::buffer;
use impact_map_spatial::join::{distinct_by_id, intersecting_join, intersecting_join_geometry};

use crate::AnalysisError;
use crate::aggregate::sum_attribute;
use crate::locate::{locate, work_names};
use crate::serialize::serialize;

/// Runs impact analyses against a shared, read-only dataset store.
///
/// Buildings and population are reprojected into the working CRS once,
/// at construction. Each analysis only reprojects the matched work and
/// keeps all intermediate results local to the call, so one analyzer can
/// serve concurrent requests through a shared reference.
#[derive(Debug)]
pub struct ImpactAnalyzer {
    store: Arc<GeometryStore>,
    config: AnalysisConfig,
    buildings: FeatureCollection,
    population: FeatureCollection,
}

impl ImpactAnalyzer {
    /// Validates `config` and prepares the working-CRS collections.
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::UnsupportedCrs`] if the working CRS or a dataset
    ///   CRS is unknown, or the working CRS is not projected
    /// * [`AnalysisError::Internal`] if the config is invalid or a dataset
    ///   coordinate cannot be reprojected
    pub fn new(store: Arc<GeometryStore>, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;

        let crs = config.working_crs;
        if !projection::is_projected(crs)? {
            return Err(AnalysisError::UnsupportedCrs { crs });
        }

        let buildings = reproject(store.buildings(), crs)?;
        let population = reproject(store.population(), crs)?;

        log::info!(
            "Prepared {} buildings and {} population features in {crs}",
            buildings.len(),
            population.len()
        );

        Ok(Self {
            store,
            config,
            buildings,
            population,
        })
    }

    /// The configuration this analyzer runs with.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The underlying dataset store.
    #[must_use]
    pub fn store(&self) -> &GeometryStore {
        &self.store
    }

    /// Names of every work that can be analyzed.
    #[must_use]
    pub fn work_names(&self) -> Vec<String> {
        work_names(self.store.works(), &self.config.work_name_attribute)
    }

    /// Analyzes the work whose name contains `query`.
    ///
    /// Either the whole analysis succeeds or an error is returned; no
    /// partial result is ever produced. A panic inside the geometry
    /// kernels is caught and reported as [`AnalysisError::Internal`].
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::NotFound`] or [`AnalysisError::AmbiguousMatch`]
    ///   if the query does not resolve to one work
    /// * [`AnalysisError::InvalidAttribute`] if an affected resident has a
    ///   non-numeric population value
    /// * any other [`AnalysisError`] on data or configuration defects
    pub fn run_impact_analysis(&self, query: &str) -> Result<ImpactAnalysisResult, AnalysisError> {
        catch_unwind(AssertUnwindSafe(|| self.analyze(query))).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Analysis of '{query}' panicked: {message}");
            Err(AnalysisError::Internal {
                message: format!("analysis panicked: {message}"),
            })
        })
    }

    fn analyze(&self, query: &str) -> Result<ImpactAnalysisResult, AnalysisError> {
        let config = &self.config;
        let crs = config.working_crs;
        let works = self.store.works();

        let work = locate(works, query, &config.work_name_attribute, config.match_policy)?;
        let work_name = work
            .text_property(&config.work_name_attribute)
            .unwrap_or_default()
            .to_string();
        log::info!("Query '{query}' matched work {} '{work_name}'", work.id);

        let work_geometry = reproject_geometry(&work.geometry, works.crs(), crs)?;
        let buffer_geometry = buffer(&work_geometry, crs, config.buffer_distance_m)?;

        let affected_buildings = intersecting_join_geometry(
            &self.buildings,
            &Geometry::MultiPolygon(buffer_geometry.clone()),
            crs,
        )?;
        log::debug!(
            "{} of {} buildings intersect the {}m buffer",
            affected_buildings.len(),
            self.buildings.len(),
            config.buffer_distance_m
        );

        // A resident on a shared wall joins once per building; count it once.
        let residents = distinct_by_id(&intersecting_join(&self.population, &affected_buildings)?);
        let affected_population = sum_attribute(&residents, &config.population_attribute)?;
        log::debug!(
            "{} population features intersect the affected buildings",
            residents.len()
        );

        let result = serialize(
            &buffer_geometry,
            crs,
            &affected_buildings,
            &work_name,
            affected_population,
        )?;

        log::info!(
            "Work '{work_name}': {} buildings, {} residents within {}m",
            result.affected_building_count(),
            result.affected_population_count,
            config.buffer_distance_m
        );

        Ok(result)
    }
}
