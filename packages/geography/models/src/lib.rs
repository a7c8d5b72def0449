#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vector feature types shared by the impact-analysis pipeline.
//!
//! A [`FeatureCollection`] is an ordered list of [`Feature`]s that share
//! one [`Crs`]. Collections are built once at load time and only read
//! afterwards; every derived collection (reprojection, join output) is a
//! fresh value.

mod attribute;
mod crs;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geo::{BoundingRect, Geometry, Rect};
use serde::{Deserialize, Serialize};

pub use attribute::{AttributeCoercionError, AttributeValue, DATETIME_DISPLAY_FORMAT};
pub use crs::{Crs, ParseCrsError};

/// A single real-world entity: a geometry plus named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Row identifier, stable across reprojection and joins. Loaders
    /// assign the feature's position in its source file.
    pub id: u64,
    /// Geometry in the owning collection's CRS.
    pub geometry: Geometry<f64>,
    /// Attribute name -> value.
    pub properties: BTreeMap<String, AttributeValue>,
}

impl Feature {
    /// Creates a feature with no attributes.
    #[must_use]
    pub const fn new(id: u64, geometry: Geometry<f64>) -> Self {
        Self {
            id,
            geometry,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&AttributeValue> {
        self.properties.get(name)
    }

    /// Looks up a text attribute. Missing, null and non-text values yield
    /// `None`.
    #[must_use]
    pub fn text_property(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(AttributeValue::as_text)
    }
}

/// An ordered sequence of features sharing a CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    crs: Crs,
    features: Vec<Feature>,
}

impl FeatureCollection {
    /// Creates a collection from features already expressed in `crs`.
    #[must_use]
    pub const fn new(crs: Crs, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    /// Creates an empty collection.
    #[must_use]
    pub const fn empty(crs: Crs) -> Self {
        Self::new(crs, Vec::new())
    }

    /// Wraps a lone geometry as a one-feature collection with id `0`.
    #[must_use]
    pub fn single(crs: Crs, geometry: Geometry<f64>) -> Self {
        Self::new(crs, vec![Feature::new(0, geometry)])
    }

    /// The CRS every feature geometry is expressed in.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// The features in collection order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Iterates over the features in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Consumes the collection, returning its features.
    #[must_use]
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    /// Bounding box over every feature geometry, or `None` when the
    /// collection is empty or only holds empty geometries.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .map(BoundingBox::from)
            .reduce(|a, b| a.union(&b))
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// An axis-aligned bounding box. In a geographic CRS `west`/`east` are
/// longitudes and `south`/`north` latitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum x (western longitude).
    pub west: f64,
    /// Minimum y (southern latitude).
    pub south: f64,
    /// Maximum x (eastern longitude).
    pub east: f64,
    /// Maximum y (northern latitude).
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns `[west, south, east, north]`, the order map viewports expect.
    #[must_use]
    pub const fn to_array(self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Smallest box covering both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.west.min(other.west),
            self.south.min(other.south),
            self.east.max(other.east),
            self.north.max(other.north),
        )
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Where one dataset lives and which CRS to assume when the file does
/// not declare one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSource {
    /// Path to a `GeoJSON` `FeatureCollection`.
    pub path: PathBuf,
    /// CRS assumed when the file has no `crs` member.
    pub default_crs: Crs,
}

impl DatasetSource {
    /// Creates a dataset source.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, default_crs: Crs) -> Self {
        Self {
            path: path.into(),
            default_crs,
        }
    }
}

/// Locations of the three datasets the analysis reads.
///
/// Any dataset table, or any key inside one, may be omitted; the missing
/// parts come from [`DatasetConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PartialDatasetConfig", rename_all = "camelCase")]
pub struct DatasetConfig {
    /// Construction works (lines, points or polygons).
    pub works: DatasetSource,
    /// Building footprints.
    pub buildings: DatasetSource,
    /// Resident population points.
    pub population: DatasetSource,
}

impl DatasetConfig {
    /// Default directory holding the three `GeoJSON` files.
    pub const DEFAULT_DATA_DIR: &'static str = "static/data";

    /// Default works file name.
    pub const WORKS_FILE: &'static str = "obres.geojson";
    /// Default buildings file name.
    pub const BUILDINGS_FILE: &'static str = "edificis.geojson";
    /// Default population file name.
    pub const POPULATION_FILE: &'static str = "poblacio.geojson";

    /// Default file layout inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            works: DatasetSource::new(dir.join(Self::WORKS_FILE), Crs::WGS84),
            buildings: DatasetSource::new(dir.join(Self::BUILDINGS_FILE), Crs::ETRS89_UTM_31N),
            population: DatasetSource::new(dir.join(Self::POPULATION_FILE), Crs::WGS84),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self::in_dir(Path::new(Self::DEFAULT_DATA_DIR))
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PartialDatasetSource {
    path: Option<PathBuf>,
    default_crs: Option<Crs>,
}

impl PartialDatasetSource {
    fn or(self, fallback: DatasetSource) -> DatasetSource {
        DatasetSource {
            path: self.path.unwrap_or(fallback.path),
            default_crs: self.default_crs.unwrap_or(fallback.default_crs),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct PartialDatasetConfig {
    works: PartialDatasetSource,
    buildings: PartialDatasetSource,
    population: PartialDatasetSource,
}

impl From<PartialDatasetConfig> for DatasetConfig {
    fn from(partial: PartialDatasetConfig) -> Self {
        let defaults = Self::default();
        Self {
            works: partial.works.or(defaults.works),
            buildings: partial.buildings.or(defaults.buildings),
            population: partial.population.or(defaults.population),
        }
    }
}
