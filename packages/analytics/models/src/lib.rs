#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration and result types for work impact analysis.
//!
//! [`AnalysisConfig`] carries the tunable parameters of the pipeline.
//! [`ImpactAnalysisResult`] is what one successful analysis produces, and
//! [`MapPayload`] is the `GeoJSON` shape a map front end consumes.

use geo::MultiPolygon;
use impact_map_geography_models::{BoundingBox, Crs, FeatureCollection};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default impact radius around a work, in metres.
pub const DEFAULT_BUFFER_DISTANCE_M: f64 = 30.0;

/// Default name of the per-resident population estimate attribute.
pub const DEFAULT_POPULATION_ATTRIBUTE: &str = "estimacioPoblacio";

/// Default name of the work name attribute.
pub const DEFAULT_WORK_NAME_ATTRIBUTE: &str = "nombre";

/// How the locator resolves a query that matches several works.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchPolicy {
    /// Take the first match in collection order.
    #[default]
    First,
    /// Fail with an ambiguity error unless exactly one work matches, or
    /// one of the matches equals the query.
    RequireUnique,
}

/// Tunable parameters of an impact analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Buffer radius around the work, in metres.
    pub buffer_distance_m: f64,
    /// Numeric attribute summed over affected population features.
    pub population_attribute: String,
    /// Text attribute the locator matches the query against.
    pub work_name_attribute: String,
    /// Projected CRS that buffering and joins run in.
    pub working_crs: Crs,
    /// Tie-break policy for ambiguous queries.
    pub match_policy: MatchPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buffer_distance_m: DEFAULT_BUFFER_DISTANCE_M,
            population_attribute: DEFAULT_POPULATION_ATTRIBUTE.to_string(),
            work_name_attribute: DEFAULT_WORK_NAME_ATTRIBUTE.to_string(),
            working_crs: Crs::ETRS89_UTM_31N,
            match_policy: MatchPolicy::First,
        }
    }
}

impl AnalysisConfig {
    /// Checks the values that can be validated without a projection
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfigError`] if the buffer distance is not a
    /// positive finite number or an attribute name is blank.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if !(self.buffer_distance_m.is_finite() && self.buffer_distance_m > 0.0) {
            return Err(InvalidConfigError {
                message: format!(
                    "buffer distance must be a positive number of metres, got {}",
                    self.buffer_distance_m
                ),
            });
        }
        if self.population_attribute.trim().is_empty() {
            return Err(InvalidConfigError {
                message: "population attribute name is empty".to_string(),
            });
        }
        if self.work_name_attribute.trim().is_empty() {
            return Err(InvalidConfigError {
                message: "work name attribute is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Error returned by [`AnalysisConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConfigError {
    /// What is wrong with the configuration.
    pub message: String,
}

impl std::fmt::Display for InvalidConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid analysis configuration: {}", self.message)
    }
}

impl std::error::Error for InvalidConfigError {}

/// Outcome of one successful impact analysis. All geometry is in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactAnalysisResult {
    /// Extent of the buffer as `[west, south, east, north]` degrees.
    pub bounding_box: BoundingBox,
    /// Buildings whose footprint intersects the buffer.
    pub affected_buildings: FeatureCollection,
    /// The impact buffer around the matched work.
    pub buffer_geometry: MultiPolygon<f64>,
    /// Summed population estimate, before truncation.
    pub affected_population: f64,
    /// `affected_population` truncated to a whole headcount.
    pub affected_population_count: u64,
    /// Name of the work the query resolved to.
    pub matched_work_name: String,
    /// HTML-safe one-line summary for display.
    pub summary: String,
    /// Map layers and viewport for the front end.
    pub map: MapPayload,
}

impl ImpactAnalysisResult {
    /// Number of affected buildings.
    #[must_use]
    pub fn affected_building_count(&self) -> usize {
        self.affected_buildings.len()
    }
}

/// Map update sent to the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPayload {
    /// Viewport as `[west, south, east, north]` degrees.
    pub bounds: [f64; 4],
    /// Renderable layers.
    pub layers: MapLayers,
}

/// The `GeoJSON` layers of a [`MapPayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayers {
    /// The buffer polygon as a one-feature collection.
    pub buffer: geojson::FeatureCollection,
    /// Affected building footprints with their attributes.
    pub buildings: geojson::FeatureCollection,
}
